//! 与远端执行器之间的协议：事件帧解码、事件结构、请求体

pub mod event;
pub mod frame;
pub mod request;

pub use event::{
    AddressChoices, AddressOption, BatchComplete, BatchItem, BatchItemStatus, BatchStart, Event,
    EventKind, OptionChoices, OptionItem, OptionKind, PaymentChoices, PaymentOption,
    ProductChoices, ProductOption, RunConfig,
};
pub use frame::FrameDecoder;
pub use request::{
    load_batch_items, Action, AgentRequest, BatchOrderItem, BatchOrderRequest, Platform,
    ResumeResponse, UserInputRequest,
};
