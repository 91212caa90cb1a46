use std::sync::Arc;

use tracing::debug;

use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, Result, TestAction, TestContext,
};

/// 顺序容器
///
/// 按声明顺序逐个执行子动作, 第一个失败立即终止并原样向上传播。
#[derive(Debug)]
pub struct Sequence {
    pub(super) core: ContainerCore,
}

impl Sequence {
    pub fn new(name: impl Into<String>, actions: Vec<ActionRef>) -> Self {
        Self {
            core: ContainerCore::new(name, actions),
        }
    }

    pub fn builder() -> SequenceBuilder {
        SequenceBuilder::default()
    }
}

impl TestAction for Sequence {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn description(&self) -> Option<&str> {
        self.core.description()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        debug!("顺序执行 {} 个动作: {}", self.core.actions().len(), self.name());
        self.core.execute_children(context)
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 顺序容器构建器
#[derive(Default)]
pub struct SequenceBuilder {
    name: Option<String>,
    description: Option<String>,
    actions: Vec<ActionRef>,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 声明式添加子动作 (排在作用域内收集的动作之前)
    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }
}

impl ContainerBuilder for SequenceBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        self.actions.extend(actions);
        let name = self.name.unwrap_or_else(|| "sequential".to_string());
        let core = ContainerCore::new(name, self.actions).with_description(self.description);
        Ok(Arc::new(Sequence { core }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{FailAction, FnAction};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fail_fast() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counting = |counter: Arc<AtomicUsize>| -> ActionRef {
            Arc::new(FnAction::new("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
        };

        let sequence = Sequence::new(
            "seq",
            vec![
                counting(counter.clone()),
                Arc::new(FailAction::new("boom")),
                counting(counter.clone()),
            ],
        );

        let error = sequence.execute(&TestContext::new()).unwrap_err();
        assert_eq!(error.message(), "boom");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(sequence.executed_actions().len(), 2);
    }

    #[test]
    fn test_builder_merges_declared_actions() {
        let declared: ActionRef = Arc::new(FnAction::new("declared", |_| Ok(())));
        let scoped: ActionRef = Arc::new(FnAction::new("scoped", |_| Ok(())));

        let action = Sequence::builder()
            .name("setup")
            .actions([declared])
            .build(vec![scoped])
            .unwrap();

        let container = action.as_container().unwrap();
        assert_eq!(action.name(), "setup");
        assert_eq!(container.action_count(), 2);
        assert_eq!(container.actions()[0].name(), "declared");
    }
}
