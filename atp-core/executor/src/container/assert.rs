use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, FailureKind,
    Result, TestAction, TestContext,
};

/// 断言异常容器
///
/// 只包含一个子动作, 期望它以指定类型 (以及可选的消息) 失败:
/// - 按期望失败: 容器成功, 失败保存在 [`Assert::caught`] 中
/// - 子动作成功: 返回 [`ExecutorError::ExpectationNotMet`]
/// - 类型或消息不符: 原样传播子动作的失败
#[derive(Debug)]
pub struct Assert {
    pub(super) core: ContainerCore,
    kind: FailureKind,
    message: Option<String>,
    caught: Mutex<Option<ExecutorError>>,
}

impl Assert {
    pub fn builder() -> AssertBuilder {
        AssertBuilder::default()
    }

    pub fn caught(&self) -> Option<ExecutorError> {
        self.caught.lock().clone()
    }

    fn matches(&self, error: &ExecutorError, context: &TestContext) -> Result<bool> {
        if !error.kind().is_a(&self.kind) {
            return Ok(false);
        }
        match &self.message {
            Some(expected) => Ok(context.replace_dynamic_content(expected)? == error.message()),
            None => Ok(true),
        }
    }
}

impl TestAction for Assert {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let error = match self.core.execute_child(0, context) {
            Ok(()) => {
                let action = &self.core.actions()[0];
                return Err(ExecutorError::ExpectationNotMet(format!(
                    "动作 {} 未抛出 {} 类型的失败",
                    action.name(),
                    self.kind
                )));
            }
            Err(e) => e,
        };

        if !self.matches(&error, context)? {
            return Err(error);
        }

        info!("断言的异常已出现 ({}): {}", self.kind, error.message());
        *self.caught.lock() = Some(error);
        Ok(())
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 断言异常容器构建器
#[derive(Default)]
pub struct AssertBuilder {
    name: Option<String>,
    kind: FailureKind,
    message: Option<String>,
    actions: Vec<ActionRef>,
}

impl AssertBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 期望的失败类型 (默认 `runtime`)
    pub fn exception(mut self, kind: impl Into<FailureKind>) -> Self {
        self.kind = kind.into();
        self
    }

    /// 期望的失败消息 (支持 `${}` 占位符, 精确匹配)
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn action(mut self, action: ActionRef) -> Self {
        self.actions.push(action);
        self
    }
}

impl ContainerBuilder for AssertBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        self.actions.extend(actions);
        if self.actions.len() != 1 {
            return Err(ExecutorError::Configuration(format!(
                "assert 容器需要恰好一个子动作, 实际为 {} 个",
                self.actions.len()
            )));
        }

        Ok(Arc::new(Assert {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "assert".to_string()),
                self.actions,
            ),
            kind: self.kind,
            message: self.message,
            caught: Mutex::new(None),
        }))
    }
}
