//! 待决提示登记表
//!
//! 五个决策族各占一个槽位，槽位为 `Option<PendingPrompt>`：同一族最多一个打开的提示，
//! 新提示到达时直接替换旧的（不会叠加）。族由提示的 choices 变体决定，不能与槽位错配。

use serde::Serialize;

use crate::core::error::SubmitError;
use crate::protocol::{
    AddressChoices, AddressOption, OptionChoices, OptionItem, OptionKind, PaymentChoices,
    PaymentOption, ProductChoices, ProductOption,
};

/// 决策族
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionFamily {
    FreeText,
    Product,
    Address,
    Payment,
    Options,
}

impl DecisionFamily {
    pub const ALL: [DecisionFamily; 5] = [
        DecisionFamily::FreeText,
        DecisionFamily::Product,
        DecisionFamily::Address,
        DecisionFamily::Payment,
        DecisionFamily::Options,
    ];

    fn slot(self) -> usize {
        match self {
            DecisionFamily::FreeText => 0,
            DecisionFamily::Product => 1,
            DecisionFamily::Address => 2,
            DecisionFamily::Payment => 3,
            DecisionFamily::Options => 4,
        }
    }
}

impl std::fmt::Display for DecisionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionFamily::FreeText => write!(f, "free-text"),
            DecisionFamily::Product => write!(f, "product"),
            DecisionFamily::Address => write!(f, "address"),
            DecisionFamily::Payment => write!(f, "payment"),
            DecisionFamily::Options => write!(f, "options"),
        }
    }
}

/// 提示携带的候选项，按族区分
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PromptChoices {
    FreeText,
    Product { products: Vec<ProductOption> },
    Address { addresses: Vec<AddressOption> },
    Payment { payments: Vec<PaymentOption> },
    Options { kind: OptionKind, options: Vec<OptionItem> },
}

impl PromptChoices {
    pub fn family(&self) -> DecisionFamily {
        match self {
            PromptChoices::FreeText => DecisionFamily::FreeText,
            PromptChoices::Product { .. } => DecisionFamily::Product,
            PromptChoices::Address { .. } => DecisionFamily::Address,
            PromptChoices::Payment { .. } => DecisionFamily::Payment,
            PromptChoices::Options { .. } => DecisionFamily::Options,
        }
    }

    /// 候选项数量；自由文本为 0
    pub fn len(&self) -> usize {
        match self {
            PromptChoices::FreeText => 0,
            PromptChoices::Product { products } => products.len(),
            PromptChoices::Address { addresses } => addresses.len(),
            PromptChoices::Payment { payments } => payments.len(),
            PromptChoices::Options { options, .. } => options.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 每个候选项的单行标签（按顺序）
    pub fn labels(&self) -> Vec<String> {
        match self {
            PromptChoices::FreeText => Vec::new(),
            PromptChoices::Product { products } => products
                .iter()
                .map(|p| format!("{} - {} ({})", p.name, p.price, p.rating))
                .collect(),
            PromptChoices::Address { addresses } => addresses
                .iter()
                .map(|a| format!("{}, {}", a.name, a.address))
                .collect(),
            PromptChoices::Payment { payments } => payments
                .iter()
                .map(|p| match &p.description {
                    Some(d) if !d.is_empty() => format!("{} - {}", p.method, d),
                    _ => p.method.clone(),
                })
                .collect(),
            PromptChoices::Options { options, .. } => options
                .iter()
                .map(|o| match &o.description {
                    Some(d) if !d.is_empty() => format!("{} - {}", o.label, d),
                    _ => o.label.clone(),
                })
                .collect(),
        }
    }

    /// 选中项的简短名称，用于确认日志
    fn short_label(&self, index: usize) -> Option<String> {
        match self {
            PromptChoices::FreeText => None,
            PromptChoices::Product { products } => products.get(index).map(|p| p.name.clone()),
            PromptChoices::Address { addresses } => addresses.get(index).map(|a| a.name.clone()),
            PromptChoices::Payment { payments } => payments.get(index).map(|p| p.method.clone()),
            PromptChoices::Options { options, .. } => options.get(index).map(|o| o.label.clone()),
        }
    }
}

impl From<ProductChoices> for PromptChoices {
    fn from(p: ProductChoices) -> Self {
        PromptChoices::Product { products: p.products }
    }
}

impl From<AddressChoices> for PromptChoices {
    fn from(a: AddressChoices) -> Self {
        PromptChoices::Address { addresses: a.addresses }
    }
}

impl From<PaymentChoices> for PromptChoices {
    fn from(p: PaymentChoices) -> Self {
        PromptChoices::Payment { payments: p.payments }
    }
}

impl From<OptionChoices> for PromptChoices {
    fn from(o: OptionChoices) -> Self {
        PromptChoices::Options {
            kind: o.option_type,
            options: o.options,
        }
    }
}

/// 一个打开中的待决提示
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingPrompt {
    /// 登记表内唯一，用于判断回传成功时槽位里是否仍是同一个提示
    pub id: u64,
    pub session_id: String,
    pub message: String,
    pub choices: PromptChoices,
}

impl PendingPrompt {
    pub fn family(&self) -> DecisionFamily {
        self.choices.family()
    }
}

/// 操作员的回答：自由文本或候选项下标
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Choice(usize),
}

/// 已校验、待发送的回传
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub family: DecisionFamily,
    pub prompt_id: u64,
    pub session_id: String,
    /// 发往执行器的 input_data：原文或下标字符串
    pub input_data: String,
    /// 确认日志中显示的内容
    pub label: String,
}

/// 五族槽位
#[derive(Clone, Debug, Default)]
pub struct PromptRegistry {
    slots: [Option<PendingPrompt>; 5],
    next_id: u64,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开提示；同族已有打开的提示则被替换并返回
    pub fn open(
        &mut self,
        session_id: impl Into<String>,
        message: impl Into<String>,
        choices: PromptChoices,
    ) -> Option<PendingPrompt> {
        self.next_id += 1;
        let prompt = PendingPrompt {
            id: self.next_id,
            session_id: session_id.into(),
            message: message.into(),
            choices,
        };
        let slot = prompt.family().slot();
        self.slots[slot].replace(prompt)
    }

    pub fn get(&self, family: DecisionFamily) -> Option<&PendingPrompt> {
        self.slots[family.slot()].as_ref()
    }

    pub fn is_open(&self, family: DecisionFamily) -> bool {
        self.get(family).is_some()
    }

    pub fn any_open(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// 打开中的提示，按族固定顺序
    pub fn open_prompts(&self) -> Vec<&PendingPrompt> {
        self.slots.iter().flatten().collect()
    }

    /// 关闭指定族的提示，仅当槽位中仍是 prompt_id 对应的那个
    pub fn close(&mut self, family: DecisionFamily, prompt_id: u64) -> Option<PendingPrompt> {
        let slot = &mut self.slots[family.slot()];
        if slot.as_ref().map(|p| p.id) == Some(prompt_id) {
            slot.take()
        } else {
            None
        }
    }

    /// 校验回答并生成回传；提示不存在、下标越界或文本为空时返回提交错误
    pub fn prepare(&self, family: DecisionFamily, answer: Answer) -> Result<Submission, SubmitError> {
        let prompt = self.get(family).ok_or(SubmitError::NoPendingPrompt(family))?;
        let (input_data, label) = match answer {
            Answer::Text(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(SubmitError::EmptyAnswer);
                }
                (text.clone(), text)
            }
            Answer::Choice(index) => {
                if matches!(prompt.choices, PromptChoices::FreeText) {
                    // 自由文本提示收到下标时按原文发送
                    (index.to_string(), index.to_string())
                } else {
                    let label = prompt.choices.short_label(index).ok_or(
                        SubmitError::ChoiceOutOfRange {
                            index,
                            len: prompt.choices.len(),
                        },
                    )?;
                    (index.to_string(), label)
                }
            }
        };
        Ok(Submission {
            family,
            prompt_id: prompt.id,
            session_id: prompt.session_id.clone(),
            input_data,
            label,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.slots = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payments() -> PromptChoices {
        PromptChoices::Payment {
            payments: vec![
                PaymentOption { method: "COD".into(), description: None },
                PaymentOption { method: "UPI".into(), description: Some("pay via app".into()) },
            ],
        }
    }

    #[test]
    fn second_prompt_of_same_family_replaces_first() {
        let mut reg = PromptRegistry::new();
        assert!(reg.open("s1", "q1", PromptChoices::FreeText).is_none());
        let replaced = reg.open("s1", "q2", PromptChoices::FreeText).unwrap();
        assert_eq!(replaced.message, "q1");
        assert_eq!(reg.open_prompts().len(), 1);
        assert_eq!(reg.get(DecisionFamily::FreeText).unwrap().message, "q2");
    }

    #[test]
    fn families_are_independent() {
        let mut reg = PromptRegistry::new();
        reg.open("s1", "q", PromptChoices::FreeText);
        reg.open("s1", "pay", payments());
        assert!(reg.is_open(DecisionFamily::FreeText));
        assert!(reg.is_open(DecisionFamily::Payment));
        assert!(!reg.is_open(DecisionFamily::Address));
        assert_eq!(reg.open_prompts().len(), 2);
    }

    #[test]
    fn close_ignores_stale_prompt_id() {
        let mut reg = PromptRegistry::new();
        reg.open("s1", "q1", PromptChoices::FreeText);
        let old_id = reg.get(DecisionFamily::FreeText).unwrap().id;
        reg.open("s1", "q2", PromptChoices::FreeText);
        assert!(reg.close(DecisionFamily::FreeText, old_id).is_none());
        assert!(reg.is_open(DecisionFamily::FreeText));
        let new_id = reg.get(DecisionFamily::FreeText).unwrap().id;
        assert!(reg.close(DecisionFamily::FreeText, new_id).is_some());
        assert!(!reg.any_open());
    }

    #[test]
    fn prepare_choice_uses_index_and_label() {
        let mut reg = PromptRegistry::new();
        reg.open("sess-9", "pay", payments());
        let sub = reg.prepare(DecisionFamily::Payment, Answer::Choice(1)).unwrap();
        assert_eq!(sub.session_id, "sess-9");
        assert_eq!(sub.input_data, "1");
        assert_eq!(sub.label, "UPI");
    }

    #[test]
    fn prepare_rejects_out_of_range_and_missing() {
        let mut reg = PromptRegistry::new();
        assert!(matches!(
            reg.prepare(DecisionFamily::Product, Answer::Choice(0)),
            Err(SubmitError::NoPendingPrompt(DecisionFamily::Product))
        ));
        reg.open("s", "pay", payments());
        assert!(matches!(
            reg.prepare(DecisionFamily::Payment, Answer::Choice(5)),
            Err(SubmitError::ChoiceOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn prepare_text_trims_and_rejects_empty() {
        let mut reg = PromptRegistry::new();
        reg.open("s", "OTP?", PromptChoices::FreeText);
        assert!(matches!(
            reg.prepare(DecisionFamily::FreeText, Answer::Text("   ".into())),
            Err(SubmitError::EmptyAnswer)
        ));
        let sub = reg
            .prepare(DecisionFamily::FreeText, Answer::Text(" 123456 ".into()))
            .unwrap();
        assert_eq!(sub.input_data, "123456");
    }
}
