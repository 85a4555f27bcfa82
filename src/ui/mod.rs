//! TUI 层：Ratatui + crossterm，主循环（app）、输入解析（command）、事件（event）、渲染（render）

pub mod app;
pub mod command;
pub mod event;
pub mod render;

pub use app::{run_app, ConsoleState};
pub use command::{parse_line, ConsoleAction, ConsoleDefaults};
pub use event::EventHandler;
pub use render::draw;
