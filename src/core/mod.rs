//! 核心编排层：错误分类、快照、读流监管、决策回传、主控循环

pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod state;
pub mod submitter;

pub use error::{DecodeError, DispatchError, PayloadError, SubmitError, TransportError};
pub use orchestrator::{create_session, Command};
pub use session_supervisor::SessionSupervisor;
pub use state::RunSnapshot;
pub use submitter::ResumeSubmitter;
