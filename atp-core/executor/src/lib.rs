//! ATP 执行器
//!
//! 测试动作编排引擎: 叶子动作立即执行, 容器动作先收集子动作,
//! 在容器关闭时按各自的调度策略 (顺序 / 并行 / 循环 / 异常捕获 / 模板) 执行。

pub mod action;
pub mod actions;
pub mod config;
pub mod container;
pub mod failure;
pub mod registry;
pub mod report;
pub mod runner;
pub mod test_case;

pub use action::{
    ActionContainer, ActionRecord, ActionRef, ActionStatus, ContainerBuilder, ContainerCore,
    TestAction,
};
pub use actions::{
    CreateVariablesAction, EchoAction, FailAction, FnAction, SleepAction, StopTimeAction,
    TraceVariablesAction,
};
pub use config::{EnvironmentConfig, ExecutorConfig, RunnerConfig};
pub use container::{
    Assert, AssertBuilder, Catch, CatchBuilder, Condition, Conditional, ConditionalBuilder,
    IterationCondition, Iterate, IterateBuilder, Parallel, ParallelBuilder, RepeatBuilder,
    RepeatOnErrorBuilder, RepeatOnErrorUntilTrue, RepeatUntilTrue, Sequence, SequenceBuilder,
    Template, TemplateBuilder,
};
pub use failure::{ActionFailure, FailureKind};
pub use registry::{TemplateDefinition, TemplateRegistry};
pub use report::{ExecutionReport, StepReport};
pub use runner::TestRunner;
pub use test_case::{TestCase, TestResult};

pub use atp_context::{ContextError, TestContext, Value};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    #[error("动作执行失败: {0}")]
    ActionFailed(ActionFailure),

    #[error("期望的异常未抛出: {0}")]
    ExpectationNotMet(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("模板 {0} 不存在")]
    TemplateNotFound(String),

    #[error("上下文错误: {0}")]
    Context(#[from] ContextError),
}

impl ExecutorError {
    /// 指定类型的执行失败
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        ExecutorError::ActionFailed(ActionFailure::new(kind, message))
    }

    /// 通用运行时失败
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::RUNTIME, message)
    }

    /// 失败类型, 用于 catch / assert 匹配
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutorError::ActionFailed(failure) => failure.kind.clone(),
            ExecutorError::ExpectationNotMet(_) => FailureKind::EXPECTATION,
            ExecutorError::Configuration(_) | ExecutorError::TemplateNotFound(_) => {
                FailureKind::CONFIGURATION
            }
            ExecutorError::Context(ContextError::Expression { .. }) => FailureKind::EXPRESSION,
            ExecutorError::Context(_) => FailureKind::VARIABLE,
        }
    }

    /// 失败消息: 执行失败返回原始消息, 其余返回完整描述
    pub fn message(&self) -> String {
        match self {
            ExecutorError::ActionFailed(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }

    /// 是否为构建期错误
    pub fn is_build_error(&self) -> bool {
        self.kind() == FailureKind::CONFIGURATION
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ExecutorError::runtime("x").kind(), FailureKind::RUNTIME);
        assert_eq!(
            ExecutorError::ExpectationNotMet("x".into()).kind(),
            FailureKind::EXPECTATION
        );
        assert_eq!(
            ExecutorError::from(ContextError::UnknownVariable("v".into())).kind(),
            FailureKind::VARIABLE
        );
        assert!(ExecutorError::TemplateNotFound("t".into()).is_build_error());
        assert!(!ExecutorError::runtime("x").is_build_error());
    }

    #[test]
    fn test_error_message() {
        let error = ExecutorError::failed(FailureKind::VALIDATION, "value mismatch");
        assert_eq!(error.message(), "value mismatch");
        assert_eq!(
            error.to_string(),
            "动作执行失败: [runtime.validation] value mismatch"
        );
        assert_eq!(
            ExecutorError::Configuration("bad".into()).message(),
            "配置错误: bad"
        );
    }
}
