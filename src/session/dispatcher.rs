//! 事件分发：按 type 把每个事件路由到时间线 / 提示登记表 / 批量进度之一
//!
//! 纯同步，不做网络调用；事件按解码顺序逐个应用，不重排、不攒批。

use crate::core::error::DispatchError;
use crate::protocol::{
    AddressChoices, BatchComplete, BatchItem, BatchStart, Event, EventKind, OptionChoices,
    PaymentChoices, ProductChoices, RunConfig,
};
use crate::session::prompts::PromptChoices;
use crate::session::run::Run;
use crate::session::timeline::LogBody;

/// 分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Applied,
    /// 缺少 type 或 type 不在封闭集合内
    Ignored,
}

pub fn dispatch(run: &mut Run, event: &Event) -> Result<Dispatched, DispatchError> {
    let Some(kind) = event.kind else {
        return Ok(Dispatched::Ignored);
    };

    match kind {
        EventKind::Config => {
            let cfg: RunConfig = event.payload()?;
            run.timeline.text(describe_config(&cfg));
        }
        EventKind::BatchStart => {
            let start: BatchStart = event.payload()?;
            run.batch.clear();
            run.push_log(LogBody::BatchStart(start));
        }
        EventKind::BatchStatus => {
            let items: Vec<BatchItem> = event.payload()?;
            run.batch.replace(items);
        }
        EventKind::BatchComplete => {
            let done: BatchComplete = event.payload()?;
            run.push_log(LogBody::BatchComplete(done));
        }
        EventKind::Log => run.timeline.text(event.content_text()),
        EventKind::RequestInput => {
            let session_id = session_of(event, kind)?;
            open_prompt(run, session_id, event.content_text(), PromptChoices::FreeText);
        }
        EventKind::ProductChoices => {
            let session_id = session_of(event, kind)?;
            let p: ProductChoices = event.payload()?;
            run.timeline.text(format!("Found {} products", p.products.len()));
            let message = p.message.clone();
            open_prompt(run, session_id, message, p.into());
        }
        EventKind::AddressChoices => {
            let session_id = session_of(event, kind)?;
            let a: AddressChoices = event.payload()?;
            run.timeline
                .text(format!("Found {} delivery addresses", a.addresses.len()));
            let message = a.message.clone();
            open_prompt(run, session_id, message, a.into());
        }
        EventKind::PaymentChoices => {
            let session_id = session_of(event, kind)?;
            let p: PaymentChoices = event.payload()?;
            run.timeline
                .text(format!("Found {} payment methods", p.payments.len()));
            let message = p.message.clone();
            open_prompt(run, session_id, message, p.into());
        }
        EventKind::Options => {
            let session_id = session_of(event, kind)?;
            let o: OptionChoices = event.payload()?;
            run.timeline
                .text(format!("{} ({} options)", o.message, o.options.len()));
            let message = o.message.clone();
            open_prompt(run, session_id, message, o.into());
        }
        EventKind::Result => run.push_log(result_entry(&event.content)),
        EventKind::Error => run.timeline.error(event.content_text()),
        EventKind::Unknown => return Ok(Dispatched::Ignored),
    }
    Ok(Dispatched::Applied)
}

/// 同族已有打开的提示时直接替换
fn open_prompt(run: &mut Run, session_id: String, message: String, choices: PromptChoices) {
    if let Some(old) = run.prompts.open(session_id, message, choices) {
        tracing::warn!(
            family = %old.family(),
            session_id = %old.session_id,
            "pending prompt replaced before it was answered"
        );
    }
}

fn session_of(event: &Event, kind: EventKind) -> Result<String, DispatchError> {
    event
        .session_id
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or(DispatchError::MissingSession(kind.as_str()))
}

fn describe_config(cfg: &RunConfig) -> String {
    let mut parts = Vec::new();
    if let Some(p) = &cfg.platform {
        parts.push(format!("platform={p}"));
    }
    if let Some(a) = &cfg.action {
        parts.push(format!("action={a}"));
    }
    if let Some(t) = cfg.temperature {
        parts.push(format!("temperature={t}"));
    }
    format!("Config: {}", parts.join(", "))
}

/// result 内容能解析为 JSON 则为结构化结果，否则降级为原文成功条目
fn result_entry(content: &serde_json::Value) -> LogBody {
    match content {
        serde_json::Value::String(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => LogBody::StructuredResult(value),
            Err(_) => LogBody::Success(raw.clone()),
        },
        serde_json::Value::Null => LogBody::Success(String::new()),
        other => LogBody::StructuredResult(other.clone()),
    }
}
