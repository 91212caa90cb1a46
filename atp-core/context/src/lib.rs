//! ATP 测试上下文
//!
//! 测试执行期间共享的变量存储:
//! - 分层作用域 (子作用域写入本地, 读取回落到父作用域)
//! - `${name}` 占位符替换
//! - 命名计时器 / 计数器注册表
//! - 条件表达式求值 (默认基于 rhai)

pub mod context;
pub mod expression;
pub mod substitution;
pub mod timers;

pub use context::{value_to_string, TestContext, TEST_NAME_VARIABLE};
pub use expression::{ExpressionEvaluator, RhaiExpressionEvaluator};
pub use timers::TimerRegistry;

/// 重新导出变量值类型, 调用方无需直接依赖 serde_json
pub use serde_json::Value;

use thiserror::Error;

/// 上下文层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("未知变量: {0}")]
    UnknownVariable(String),

    #[error("无效的变量名: '{0}'")]
    InvalidVariableName(String),

    #[error("变量占位符未闭合: {0}")]
    UnbalancedPlaceholder(String),

    #[error("表达式求值失败 '{expression}': {message}")]
    Expression { expression: String, message: String },
}

pub type Result<T> = std::result::Result<T, ContextError>;
