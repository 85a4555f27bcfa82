//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将输入行与快捷键转为 Command 发送给编排器，
//! 每帧用 draw 渲染 RunSnapshot 与控制台本地状态（输入缓冲、聚焦的提示族、选中项）。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, RunSnapshot};
use crate::session::{Answer, DecisionFamily, PromptChoices};
use crate::ui::command::{parse_line, ConsoleAction, ConsoleDefaults, USAGE};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

/// 控制台本地状态（不属于 Run，只影响显示与回答的构造）
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub input: String,
    /// 当前聚焦的提示族；Enter 的回答发往此族
    pub focus: Option<DecisionFamily>,
    /// 聚焦提示中高亮的候选项
    pub selected: usize,
    pub defaults: ConsoleDefaults,
    /// 本地提示信息（命令解析错误等），不进入时间线
    pub notice: Option<String>,
    pub scroll: usize,
}

impl ConsoleState {
    pub fn new(defaults: ConsoleDefaults) -> Self {
        Self {
            input: String::new(),
            focus: None,
            selected: 0,
            defaults,
            notice: Some(USAGE.to_string()),
            scroll: usize::MAX,
        }
    }

    /// 快照变化后校正聚焦：聚焦的族已关闭则移到第一个打开的族
    pub fn sync(&mut self, snapshot: &RunSnapshot) {
        let open = snapshot.open_families();
        if self.focus.map_or(true, |f| !open.contains(&f)) {
            self.focus = open.first().copied();
            self.selected = 0;
        }
        if let Some(len) = self.focused_len(snapshot) {
            if len > 0 && self.selected >= len {
                self.selected = len - 1;
            }
        }
    }

    /// Tab：在打开的提示族之间循环
    pub fn cycle_focus(&mut self, snapshot: &RunSnapshot) {
        let open = snapshot.open_families();
        if open.is_empty() {
            self.focus = None;
            return;
        }
        let next = match self.focus.and_then(|f| open.iter().position(|o| *o == f)) {
            Some(i) => open[(i + 1) % open.len()],
            None => open[0],
        };
        self.focus = Some(next);
        self.selected = 0;
    }

    pub fn move_selection(&mut self, snapshot: &RunSnapshot, up: bool) {
        let Some(len) = self.focused_len(snapshot).filter(|l| *l > 0) else {
            return;
        };
        self.selected = if up {
            self.selected.saturating_sub(1)
        } else {
            (self.selected + 1).min(len - 1)
        };
    }

    fn focused_len(&self, snapshot: &RunSnapshot) -> Option<usize> {
        let family = self.focus?;
        snapshot.prompt(family).map(|p| p.choices.len())
    }

    /// Enter：解析输入行，返回要发给编排器的命令（若有）
    pub fn submit(&mut self, snapshot: &RunSnapshot) -> Option<Command> {
        let line = std::mem::take(&mut self.input);
        self.notice = None;
        match parse_line(&line, &self.defaults) {
            Ok(ConsoleAction::Send(cmd)) => Some(cmd),
            Ok(ConsoleAction::SetPlatform(platform)) => {
                self.defaults.platform = platform;
                self.notice = Some(format!("Platform set to {platform}"));
                None
            }
            Ok(ConsoleAction::Reply(text)) => self.reply(snapshot, text),
            Err(msg) => {
                self.notice = Some(msg);
                None
            }
        }
    }

    /// 对聚焦提示的回答：选择类提示空输入提交高亮项，数字按 1 起始的序号选择
    fn reply(&mut self, snapshot: &RunSnapshot, text: String) -> Option<Command> {
        let Some(prompt) = self.focus.and_then(|f| snapshot.prompt(f)) else {
            if !text.is_empty() {
                self.notice = Some(format!("No open prompt. {USAGE}"));
            }
            return None;
        };
        let family = prompt.family();
        let answer = match &prompt.choices {
            PromptChoices::FreeText => Answer::Text(text),
            _ if text.is_empty() => Answer::Choice(self.selected),
            _ => match text.parse::<usize>() {
                Ok(n) if n >= 1 => Answer::Choice(n - 1),
                _ => Answer::Text(text),
            },
        };
        Some(Command::Answer { family, answer })
    }
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    mut state_rx: watch::Receiver<RunSnapshot>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    defaults: ConsoleDefaults,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new();
    let mut console = ConsoleState::new(defaults);
    let mut last_timeline_len = 0usize;

    loop {
        let snapshot = state_rx.borrow_and_update().clone();
        console.sync(&snapshot);
        if snapshot.timeline.len() != last_timeline_len {
            last_timeline_len = snapshot.timeline.len();
            console.scroll = usize::MAX;
        }

        if let Ok(Some(ev)) = event_handler.poll() {
            match ev {
                AppEvent::Quit => break,
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter => {
                        if let Some(cmd) = console.submit(&snapshot) {
                            let quit = matches!(cmd, Command::Quit);
                            let _ = cmd_tx.send(cmd);
                            if quit {
                                break;
                            }
                        }
                    }
                    KeyCode::Tab => console.cycle_focus(&snapshot),
                    KeyCode::Up => console.move_selection(&snapshot, true),
                    KeyCode::Down => console.move_selection(&snapshot, false),
                    KeyCode::Backspace => {
                        console.input.pop();
                    }
                    KeyCode::Char(c) => console.input.push(c),
                    KeyCode::PageUp => console.scroll = console.scroll.saturating_sub(10),
                    KeyCode::PageDown => console.scroll = console.scroll.saturating_add(10),
                    KeyCode::Home => console.scroll = 0,
                    KeyCode::End => console.scroll = usize::MAX,
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| draw(f, &snapshot, &console, &mut scroll_info))?;
        let (total_lines, viewport_height) = scroll_info;
        console.scroll = console
            .scroll
            .min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }

    let _ = cmd_tx.send(Command::Quit);
    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OptionItem, OptionKind, Platform, ProductOption};
    use crate::session::PendingPrompt;

    fn defaults() -> ConsoleDefaults {
        ConsoleDefaults {
            platform: Platform::Amazon,
            temperature: None,
        }
    }

    fn snapshot_with(prompts: Vec<PendingPrompt>) -> RunSnapshot {
        RunSnapshot {
            prompts,
            ..RunSnapshot::default()
        }
    }

    fn product_prompt() -> PendingPrompt {
        let product = |name: &str| ProductOption {
            name: name.into(),
            price: "$1".into(),
            rating: "4".into(),
            url: None,
        };
        PendingPrompt {
            id: 1,
            session_id: "s".into(),
            message: "Pick".into(),
            choices: PromptChoices::Product {
                products: vec![product("A"), product("B"), product("C")],
            },
        }
    }

    fn free_text_prompt() -> PendingPrompt {
        PendingPrompt {
            id: 2,
            session_id: "s".into(),
            message: "OTP?".into(),
            choices: PromptChoices::FreeText,
        }
    }

    #[test]
    fn focus_follows_open_prompts_and_tab_cycles() {
        let snap = snapshot_with(vec![free_text_prompt(), product_prompt()]);
        let mut console = ConsoleState::new(defaults());
        console.sync(&snap);
        assert_eq!(console.focus, Some(DecisionFamily::FreeText));

        console.cycle_focus(&snap);
        assert_eq!(console.focus, Some(DecisionFamily::Product));
        console.cycle_focus(&snap);
        assert_eq!(console.focus, Some(DecisionFamily::FreeText));

        console.sync(&snapshot_with(vec![product_prompt()]));
        assert_eq!(console.focus, Some(DecisionFamily::Product));
        console.sync(&RunSnapshot::default());
        assert_eq!(console.focus, None);
    }

    #[test]
    fn enter_submits_highlighted_choice() {
        let snap = snapshot_with(vec![product_prompt()]);
        let mut console = ConsoleState::new(defaults());
        console.sync(&snap);
        console.move_selection(&snap, false);
        console.move_selection(&snap, false);
        console.move_selection(&snap, false);
        assert_eq!(console.selected, 2);

        match console.submit(&snap) {
            Some(Command::Answer { family, answer }) => {
                assert_eq!(family, DecisionFamily::Product);
                assert_eq!(answer, Answer::Choice(2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_number_selects_one_based() {
        let snap = snapshot_with(vec![product_prompt()]);
        let mut console = ConsoleState::new(defaults());
        console.sync(&snap);
        console.input = "1".into();
        assert!(matches!(
            console.submit(&snap),
            Some(Command::Answer { answer: Answer::Choice(0), .. })
        ));
        assert!(console.input.is_empty());
    }

    #[test]
    fn free_text_prompt_gets_the_typed_line() {
        let options = PendingPrompt {
            id: 3,
            session_id: "s".into(),
            message: "Qty".into(),
            choices: PromptChoices::Options {
                kind: OptionKind::General,
                options: vec![OptionItem { label: "1".into(), description: None, value: None }],
            },
        };
        let snap = snapshot_with(vec![free_text_prompt(), options]);
        let mut console = ConsoleState::new(defaults());
        console.sync(&snap);
        console.input = "123456".into();
        match console.submit(&snap) {
            Some(Command::Answer { family, answer }) => {
                assert_eq!(family, DecisionFamily::FreeText);
                assert_eq!(answer, Answer::Text("123456".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reply_without_prompt_sets_notice() {
        let mut console = ConsoleState::new(defaults());
        console.input = "hello".into();
        assert!(console.submit(&RunSnapshot::default()).is_none());
        assert!(console.notice.as_deref().unwrap().contains("No open prompt"));
    }

    #[test]
    fn platform_command_updates_defaults() {
        let mut console = ConsoleState::new(defaults());
        console.input = "/platform flipkart".into();
        assert!(console.submit(&RunSnapshot::default()).is_none());
        assert_eq!(console.defaults.platform, Platform::Flipkart);
    }
}
