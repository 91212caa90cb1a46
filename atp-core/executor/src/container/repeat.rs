//! 循环容器
//!
//! - [`RepeatUntilTrue`]: do-while, 每轮结束后索引加一, 以新索引判断终止条件
//! - [`Iterate`]: while, 条件成立才执行本轮
//! - [`RepeatOnErrorUntilTrue`]: 失败重试, 成功即结束, 条件成立时抛出最后一次失败

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::IterationCondition;
use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, Result,
    TestAction, TestContext,
};

const DEFAULT_INDEX_NAME: &str = "i";
const DEFAULT_START: i64 = 1;

/// 默认失败重试间隔
pub(crate) const DEFAULT_AUTO_SLEEP: Duration = Duration::from_millis(1000);

/// 循环索引设置
#[derive(Debug, Clone)]
struct LoopIndex {
    name: String,
    start: i64,
}

impl Default for LoopIndex {
    fn default() -> Self {
        Self {
            name: DEFAULT_INDEX_NAME.to_string(),
            start: DEFAULT_START,
        }
    }
}

impl LoopIndex {
    fn write(&self, context: &TestContext, index: i64) -> Result<()> {
        context.set_variable(&self.name, index)?;
        Ok(())
    }
}

fn missing_condition(kind: &str) -> ExecutorError {
    ExecutorError::Configuration(format!("{} 容器缺少循环条件", kind))
}

// ============================================
// RepeatUntilTrue
// ============================================

/// 重复执行直到条件成立 (循环体至少执行一次)
#[derive(Debug)]
pub struct RepeatUntilTrue {
    pub(super) core: ContainerCore,
    index: LoopIndex,
    condition: IterationCondition,
}

impl RepeatUntilTrue {
    pub fn builder(condition: impl Into<IterationCondition>) -> RepeatBuilder {
        RepeatBuilder::new().until(condition)
    }

    pub fn index_name(&self) -> &str {
        &self.index.name
    }
}

impl TestAction for RepeatUntilTrue {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let mut index = self.index.start;

        loop {
            self.index.write(context, index)?;
            debug!("{} 第 {} 轮", self.name(), index);
            self.core.execute_children(context)?;

            index += 1;
            self.index.write(context, index)?;

            if self.condition.evaluate(&self.index.name, index, context)? {
                break;
            }
        }

        info!("{} 结束, {} = {}", self.name(), self.index.name, index);
        Ok(())
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 重复容器构建器
#[derive(Default)]
pub struct RepeatBuilder {
    name: Option<String>,
    index: LoopIndex,
    condition: Option<IterationCondition>,
    actions: Vec<ActionRef>,
}

impl RepeatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 索引变量名 (默认 `i`)
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index.name = name.into();
        self
    }

    /// 起始索引 (默认 1)
    pub fn start_from(mut self, start: i64) -> Self {
        self.index.start = start;
        self
    }

    /// 终止条件
    pub fn until(mut self, condition: impl Into<IterationCondition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }
}

impl ContainerBuilder for RepeatBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        let condition = self.condition.ok_or_else(|| missing_condition("repeat"))?;
        self.actions.extend(actions);
        Ok(Arc::new(RepeatUntilTrue {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "repeat".to_string()),
                self.actions,
            ),
            index: self.index,
            condition,
        }))
    }
}

// ============================================
// Iterate
// ============================================

/// 条件成立时重复执行 (可能一次也不执行)
#[derive(Debug)]
pub struct Iterate {
    pub(super) core: ContainerCore,
    index: LoopIndex,
    step: i64,
    condition: IterationCondition,
}

impl Iterate {
    pub fn builder(condition: impl Into<IterationCondition>) -> IterateBuilder {
        IterateBuilder::new().condition(condition)
    }
}

impl TestAction for Iterate {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let mut index = self.index.start;
        self.index.write(context, index)?;

        while self.condition.evaluate(&self.index.name, index, context)? {
            debug!("{} 第 {} 轮", self.name(), index);
            self.core.execute_children(context)?;

            index += self.step;
            self.index.write(context, index)?;
        }

        info!("{} 结束, {} = {}", self.name(), self.index.name, index);
        Ok(())
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 迭代容器构建器
pub struct IterateBuilder {
    name: Option<String>,
    index: LoopIndex,
    step: i64,
    condition: Option<IterationCondition>,
    actions: Vec<ActionRef>,
}

impl Default for IterateBuilder {
    fn default() -> Self {
        Self {
            name: None,
            index: LoopIndex::default(),
            step: 1,
            condition: None,
            actions: Vec::new(),
        }
    }
}

impl IterateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index.name = name.into();
        self
    }

    pub fn start_from(mut self, start: i64) -> Self {
        self.index.start = start;
        self
    }

    /// 每轮索引增量 (默认 1)
    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// 继续条件
    pub fn condition(mut self, condition: impl Into<IterationCondition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }
}

impl ContainerBuilder for IterateBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        let condition = self.condition.ok_or_else(|| missing_condition("iterate"))?;
        if self.step == 0 {
            return Err(ExecutorError::Configuration(
                "iterate 容器的步长不能为 0".to_string(),
            ));
        }
        self.actions.extend(actions);
        Ok(Arc::new(Iterate {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "iterate".to_string()),
                self.actions,
            ),
            index: self.index,
            step: self.step,
            condition,
        }))
    }
}

// ============================================
// RepeatOnErrorUntilTrue
// ============================================

/// 失败重试容器
///
/// 循环体成功即结束; 失败后等待 `auto_sleep`, 索引加一,
/// 条件成立时抛出最后一次失败, 否则重试。
#[derive(Debug)]
pub struct RepeatOnErrorUntilTrue {
    pub(super) core: ContainerCore,
    index: LoopIndex,
    condition: IterationCondition,
    auto_sleep: Duration,
}

impl RepeatOnErrorUntilTrue {
    pub fn builder(condition: impl Into<IterationCondition>) -> RepeatOnErrorBuilder {
        RepeatOnErrorBuilder::new().until(condition)
    }

    pub fn auto_sleep(&self) -> Duration {
        self.auto_sleep
    }
}

impl TestAction for RepeatOnErrorUntilTrue {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let mut index = self.index.start;

        loop {
            self.index.write(context, index)?;

            let error = match self.core.execute_children(context) {
                Ok(()) => {
                    info!("{} 第 {} 次执行成功", self.name(), index);
                    return Ok(());
                }
                Err(e) => e,
            };

            warn!("{} 第 {} 次执行失败: {}", self.name(), index, error);
            if !self.auto_sleep.is_zero() {
                thread::sleep(self.auto_sleep);
            }

            index += 1;
            self.index.write(context, index)?;

            if self.condition.evaluate(&self.index.name, index, context)? {
                return Err(error);
            }
        }
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 失败重试容器构建器
#[derive(Default)]
pub struct RepeatOnErrorBuilder {
    name: Option<String>,
    index: LoopIndex,
    condition: Option<IterationCondition>,
    auto_sleep: Option<Duration>,
    actions: Vec<ActionRef>,
}

impl RepeatOnErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index.name = name.into();
        self
    }

    pub fn start_from(mut self, start: i64) -> Self {
        self.index.start = start;
        self
    }

    /// 放弃重试的条件
    pub fn until(mut self, condition: impl Into<IterationCondition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// 失败后的等待时间 (默认 1000 ms)
    pub fn auto_sleep(mut self, auto_sleep: Duration) -> Self {
        self.auto_sleep = Some(auto_sleep);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub(crate) fn default_auto_sleep(mut self, auto_sleep: Duration) -> Self {
        self.auto_sleep.get_or_insert(auto_sleep);
        self
    }
}

impl ContainerBuilder for RepeatOnErrorBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        let condition = self
            .condition
            .ok_or_else(|| missing_condition("repeat-on-error"))?;
        self.actions.extend(actions);
        Ok(Arc::new(RepeatOnErrorUntilTrue {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "repeat-on-error".to_string()),
                self.actions,
            ),
            index: self.index,
            condition,
            auto_sleep: self.auto_sleep.unwrap_or(DEFAULT_AUTO_SLEEP),
        }))
    }
}
