//! 事件处理
//!
//! 轮询 crossterm 键盘事件：Ctrl+C / Ctrl+Q 转为退出，其余按键交给 run_app 处理。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// 应用事件：退出快捷键或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Quit,
    Key(KeyEvent),
}

#[derive(Debug, Default)]
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(classify(key)));
                }
            }
        }
        Ok(None)
    }
}

fn classify(key: KeyEvent) -> AppEvent {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => AppEvent::Quit,
        _ => AppEvent::Key(key),
    }
}
