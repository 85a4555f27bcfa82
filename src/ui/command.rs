//! 控制台输入解析
//!
//! 以 `/` 开头的行是命令（/search /order /chat /batch /platform /quit），其余文本作为对当前提示的回答。

use std::path::Path;

use crate::core::Command;
use crate::protocol::{load_batch_items, Action, AgentRequest, BatchOrderRequest, Platform};

/// 发起任务时使用的默认参数（来自配置，可被 /platform 修改）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsoleDefaults {
    pub platform: Platform,
    pub temperature: Option<f64>,
}

/// 一行输入解析后的动作
#[derive(Debug, Clone)]
pub enum ConsoleAction {
    /// 直接发给编排器
    Send(Command),
    SetPlatform(Platform),
    /// 非命令文本，交给当前聚焦的提示
    Reply(String),
}

pub const USAGE: &str =
    "Commands: /search <query> | /order <url> [qty] [color] | /chat <message> | /batch <file.json> | /platform <amazon|flipkart> | /quit";

pub fn parse_line(line: &str, defaults: &ConsoleDefaults) -> Result<ConsoleAction, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ConsoleAction::Reply(line.to_string()));
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "search" => task(defaults, Action::Search, args),
        "chat" => task(defaults, Action::Chat, args),
        "order" => order(defaults, args),
        "batch" => batch(defaults, args),
        "platform" => args
            .parse::<Platform>()
            .map(ConsoleAction::SetPlatform),
        "quit" | "exit" => Ok(ConsoleAction::Send(Command::Quit)),
        other => Err(format!("Unknown command /{other}. {USAGE}")),
    }
}

fn task(defaults: &ConsoleDefaults, action: Action, args: &str) -> Result<ConsoleAction, String> {
    if args.is_empty() {
        return Err(format!("/{action} needs a message"));
    }
    let mut request = AgentRequest::new(defaults.platform, action, args);
    request.temperature = defaults.temperature;
    Ok(ConsoleAction::Send(Command::StartTask(request)))
}

/// `/order <url> [qty] [color]`；URL 缺失由请求校验处理，运行会进入 Failed
fn order(defaults: &ConsoleDefaults, args: &str) -> Result<ConsoleAction, String> {
    let mut parts = args.split_whitespace();
    let url = parts.next().unwrap_or_default();
    let quantity = match parts.next() {
        Some(q) => q
            .parse::<u32>()
            .map_err(|_| format!("Invalid quantity '{q}'"))?,
        None => 1,
    };
    let color: Vec<&str> = parts.collect();

    let mut request = AgentRequest::order(defaults.platform, url, quantity);
    if url.is_empty() {
        request.product_url = None;
    }
    if !color.is_empty() {
        request.color = Some(color.join(" "));
    }
    request.temperature = defaults.temperature;
    Ok(ConsoleAction::Send(Command::StartTask(request)))
}

fn batch(defaults: &ConsoleDefaults, args: &str) -> Result<ConsoleAction, String> {
    if args.is_empty() {
        return Err("/batch needs a JSON file path".to_string());
    }
    let items = load_batch_items(Path::new(args)).map_err(|e| format!("{e:#}"))?;
    let mut request = BatchOrderRequest::new(defaults.platform, items);
    request.temperature = defaults.temperature;
    Ok(ConsoleAction::Send(Command::StartBatch(request)))
}
