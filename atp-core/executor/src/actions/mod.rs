//! 内置叶子动作
//!
//! 叶子动作直接操作上下文或委托给外部协作者 ([`FnAction`])。

mod echo;
mod fail;
mod function;
mod timing;
mod variables;

pub use echo::EchoAction;
pub use fail::FailAction;
pub use function::FnAction;
pub use timing::{SleepAction, StopTimeAction};
pub use variables::{CreateVariablesAction, TraceVariablesAction};
