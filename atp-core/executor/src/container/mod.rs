//! 容器动作
//!
//! 每种容器是一个独立的调度策略, 内部通过 [`ContainerCore`](crate::ContainerCore)
//! 执行并记录子动作。容器由对应的构建器在作用域关闭时创建。

mod assert;
mod catch;
mod condition;
mod conditional;
mod parallel;
mod repeat;
mod sequence;
mod template;

pub use assert::{Assert, AssertBuilder};
pub use catch::{Catch, CatchBuilder};
pub use condition::{Condition, IterationCondition};
pub use conditional::{Conditional, ConditionalBuilder};
pub use parallel::{Parallel, ParallelBuilder};
pub use repeat::{
    Iterate, IterateBuilder, RepeatBuilder, RepeatOnErrorBuilder, RepeatOnErrorUntilTrue,
    RepeatUntilTrue,
};
pub use sequence::{Sequence, SequenceBuilder};
pub use template::{Template, TemplateBuilder};

/// 为嵌入 `core: ContainerCore` 字段的容器实现 [`ActionContainer`](crate::ActionContainer)
macro_rules! impl_action_container {
    ($($container:ty),+ $(,)?) => {
        $(
            impl $crate::ActionContainer for $container {
                fn actions(&self) -> &[$crate::ActionRef] {
                    self.core.actions()
                }

                fn executed_actions(&self) -> Vec<$crate::ActionRecord> {
                    self.core.executed_actions()
                }
            }
        )+
    };
}

impl_action_container!(
    Sequence,
    Parallel,
    RepeatUntilTrue,
    RepeatOnErrorUntilTrue,
    Iterate,
    Conditional,
    Catch,
    Assert,
    Template,
);
