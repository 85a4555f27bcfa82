//! 界面渲染
//!
//! 根据 RunSnapshot 与 ConsoleState 绘制：左侧为时间线（按条目类别着色、按宽度换行），
//! 有批量任务时右侧为子订单表；有打开的提示时中部显示提示面板；底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, Wrap,
    },
    Frame,
};

use crate::core::RunSnapshot;
use crate::protocol::{BatchItemStatus, OptionKind};
use crate::session::{LogKind, PromptChoices, RunKind, RunPhase};
use crate::ui::app::ConsoleState;

/// 提示面板最多展示的候选项行数
const MAX_CHOICE_ROWS: usize = 8;

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn kind_color(kind: LogKind) -> Color {
    match kind {
        LogKind::Text => Color::Gray,
        LogKind::Error => Color::Red,
        LogKind::Success => Color::Green,
        LogKind::StructuredResult => Color::Cyan,
        LogKind::BatchStart | LogKind::BatchComplete => Color::Yellow,
    }
}

fn status_color(status: BatchItemStatus) -> Color {
    match status {
        BatchItemStatus::Pending => Color::DarkGray,
        BatchItemStatus::InProgress => Color::Yellow,
        BatchItemStatus::Success => Color::Green,
        BatchItemStatus::Failed => Color::Red,
    }
}

fn phase_label(state: &RunSnapshot) -> String {
    let base = match state.phase {
        RunPhase::Idle => "idle",
        RunPhase::Running if state.awaiting_input => "awaiting input",
        RunPhase::Running => "running",
        RunPhase::Completed => "completed",
        RunPhase::Failed => "failed",
    };
    match (state.kind, state.platform) {
        (Some(RunKind::Single { action }), Some(p)) => format!("{base} │ {action} on {p}"),
        (Some(RunKind::Batch), Some(p)) => format!("{base} │ batch on {p}"),
        _ => base.to_string(),
    }
}

/// 绘制一帧；将 (时间线总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(f: &mut Frame, state: &RunSnapshot, console: &ConsoleState, out: &mut (usize, usize)) {
    let focused = console.focus.and_then(|family| state.prompt(family));
    let prompt_height = focused.map_or(0, |p| {
        let rows = p.choices.len().min(MAX_CHOICE_ROWS) as u16;
        rows + 3
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(prompt_height),
            Constraint::Length(3),
        ])
        .split(f.area());

    let main = if state.batch.is_empty() {
        vec![chunks[0]]
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[0])
            .to_vec()
    };

    *out = draw_timeline(f, state, console.scroll, main[0]);
    if let Some(area) = main.get(1) {
        draw_batch(f, state, *area);
    }
    if prompt_height > 0 {
        draw_prompt(f, state, console, chunks[1]);
    }
    draw_input(f, state, console, chunks[2]);
}

fn draw_timeline(f: &mut Frame, state: &RunSnapshot, scroll: usize, area: Rect) -> (usize, usize) {
    let block = Block::default()
        .title(format!(" Agent Desk │ {} ", phase_label(state)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let content_width = area.width.saturating_sub(3) as usize; // 边框 + 滚动条

    let mut text_lines: Vec<Line> = Vec::new();
    for entry in &state.timeline {
        let stamp = entry.created_at.format("%H:%M:%S ").to_string();
        let color = kind_color(entry.kind());
        let wrapped = wrap_text(&entry.display_text(), content_width.saturating_sub(9).max(20));
        for (i, line) in wrapped.into_iter().enumerate() {
            let pref = if i == 0 { stamp.clone() } else { " ".repeat(9) };
            text_lines.push(Line::from(vec![
                Span::styled(pref, Style::default().fg(Color::DarkGray)),
                Span::styled(line, Style::default().fg(color)),
            ]));
        }
    }

    let content_height = area.height.saturating_sub(2) as usize;
    let total_lines = text_lines.len();
    let scroll_offset = scroll.min(total_lines.saturating_sub(content_height));

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }

    (total_lines, content_height)
}

fn draw_batch(f: &mut Frame, state: &RunSnapshot, area: Rect) {
    let counts = &state.batch_counts;
    let title = format!(
        " Batch │ {} ok │ {} failed │ {} active │ {} total ",
        counts.success, counts.failed, counts.active, counts.total
    );
    let rows = state.batch.iter().map(|item| {
        let note = item
            .error
            .as_deref()
            .or(item.message.as_deref())
            .unwrap_or_default();
        Row::new(vec![
            Cell::from((item.index + 1).to_string()),
            Cell::from(item.url.clone()),
            Cell::from(item.quantity.to_string()),
            Cell::from(format!("{:?}", item.status))
                .style(Style::default().fg(status_color(item.status))),
            Cell::from(note.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Percentage(40),
            Constraint::Length(4),
            Constraint::Length(11),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["#", "url", "qty", "status", "note"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(table, area);
}

fn draw_prompt(f: &mut Frame, state: &RunSnapshot, console: &ConsoleState, area: Rect) {
    let Some(prompt) = console.focus.and_then(|family| state.prompt(family)) else {
        return;
    };
    let open = state.prompts.len();
    let title = if open > 1 {
        format!(" {} │ {} ({} open, Tab to switch) ", prompt.family(), prompt.message, open)
    } else {
        format!(" {} │ {} ", prompt.family(), prompt.message)
    };
    let border = match &prompt.choices {
        PromptChoices::Options {
            kind: OptionKind::Warning,
            ..
        } => Color::Red,
        _ => Color::Magenta,
    };

    let labels = prompt.choices.labels();
    let start = console.selected.saturating_sub(MAX_CHOICE_ROWS - 1);
    let mut lines: Vec<Line> = labels
        .iter()
        .enumerate()
        .skip(start)
        .take(MAX_CHOICE_ROWS)
        .map(|(i, label)| {
            let text = format!("{:>2}. {}", i + 1, label);
            if i == console.selected {
                Line::from(Span::styled(
                    format!("▶ {text}"),
                    Style::default().fg(Color::Black).bg(Color::Magenta),
                ))
            } else {
                Line::from(Span::raw(format!("  {text}")))
            }
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Type your answer and press Enter",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let panel = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn draw_input(f: &mut Frame, state: &RunSnapshot, console: &ConsoleState, area: Rect) {
    let title = match (&console.notice, console.focus) {
        (Some(notice), _) => format!(" {} ", notice),
        (None, Some(family)) => format!(" Answer {family} "),
        (None, None) if state.is_running => " Running… ".to_string(),
        (None, None) => format!(" Command │ platform {} ", console.defaults.platform),
    };
    let hint = " Enter 提交 │ Tab 切换提示 │ ↑↓ 选择 │ PgUp/PgDn 滚动 │ Ctrl+Q 退出 ";
    let border_color = if state.phase == RunPhase::Failed {
        Color::Red
    } else {
        Color::Blue
    };
    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    f.render_widget(Paragraph::new(console.input.as_str()).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_text_splits_by_chars() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("价格很便宜", 2), vec!["价格", "很便", "宜"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn phase_label_reflects_awaiting_input() {
        let state = RunSnapshot {
            phase: RunPhase::Running,
            is_running: true,
            awaiting_input: true,
            ..RunSnapshot::default()
        };
        assert_eq!(phase_label(&state), "awaiting input");
    }
}
