use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, FailureKind,
    Result, TestAction, TestContext,
};

/// 异常捕获容器
///
/// 子动作失败且类型属于配置的类型 (相同或更具体) 时吞掉失败, 容器成功;
/// 其他失败原样向上传播。被吞掉的失败保存在 [`Catch::caught`] 中。
#[derive(Debug)]
pub struct Catch {
    pub(super) core: ContainerCore,
    kind: FailureKind,
    caught: Mutex<Option<ExecutorError>>,
}

impl Catch {
    pub fn builder() -> CatchBuilder {
        CatchBuilder::default()
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// 最近一次被吞掉的失败
    pub fn caught(&self) -> Option<ExecutorError> {
        self.caught.lock().clone()
    }
}

impl TestAction for Catch {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        match self.core.execute_children(context) {
            Ok(()) => Ok(()),
            Err(e) if e.kind().is_a(&self.kind) => {
                info!("捕获异常 ({}): {}", self.kind, e);
                *self.caught.lock() = Some(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 异常捕获容器构建器
#[derive(Default)]
pub struct CatchBuilder {
    name: Option<String>,
    kind: FailureKind,
    actions: Vec<ActionRef>,
}

impl CatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 捕获的失败类型 (默认 `runtime`)
    pub fn exception(mut self, kind: impl Into<FailureKind>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }
}

impl ContainerBuilder for CatchBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        self.actions.extend(actions);
        Ok(Arc::new(Catch {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "catch".to_string()),
                self.actions,
            ),
            kind: self.kind,
            caught: Mutex::new(None),
        }))
    }
}
