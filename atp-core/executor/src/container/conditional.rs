use std::sync::Arc;

use tracing::info;

use super::Condition;
use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, Result,
    TestAction, TestContext,
};

/// 条件容器: 条件成立时顺序执行子动作, 否则整体跳过
#[derive(Debug)]
pub struct Conditional {
    pub(super) core: ContainerCore,
    condition: Condition,
}

impl Conditional {
    pub fn builder(condition: impl Into<Condition>) -> ConditionalBuilder {
        ConditionalBuilder::new().when(condition)
    }
}

impl TestAction for Conditional {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        if self.condition.evaluate(context)? {
            self.core.execute_children(context)
        } else {
            info!("条件 {:?} 不满足, 跳过 {}", self.condition, self.name());
            Ok(())
        }
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 条件容器构建器
#[derive(Default)]
pub struct ConditionalBuilder {
    name: Option<String>,
    condition: Option<Condition>,
    actions: Vec<ActionRef>,
}

impl ConditionalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }
}

impl ContainerBuilder for ConditionalBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        let condition = self.condition.ok_or_else(|| {
            ExecutorError::Configuration("conditional 容器缺少执行条件".to_string())
        })?;
        self.actions.extend(actions);
        Ok(Arc::new(Conditional {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "conditional".to_string()),
                self.actions,
            ),
            condition,
        }))
    }
}
