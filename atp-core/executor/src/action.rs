//! 动作抽象接口
//!
//! 所有叶子动作和容器都实现 [`TestAction`]。容器额外实现 [`ActionContainer`],
//! 暴露子动作列表和执行记录, 供诊断和报告使用。

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ExecutorError, Result, TestContext};

/// 共享的动作引用
pub type ActionRef = Arc<dyn TestAction>;

/// 测试动作 trait
///
/// 执行期间可能被多个线程同时访问 (并行容器), 因此要求 `Send + Sync`。
pub trait TestAction: Send + Sync {
    /// 动作名称 (用于日志与断言)
    fn name(&self) -> &str;

    /// 动作描述
    fn description(&self) -> Option<&str> {
        None
    }

    /// 执行动作
    fn execute(&self, context: &TestContext) -> Result<()>;

    /// 是否禁用 (禁用的动作会被跳过)
    fn is_disabled(&self, _context: &TestContext) -> bool {
        false
    }

    /// 容器视图
    fn as_container(&self) -> Option<&dyn ActionContainer> {
        None
    }
}

/// 容器 trait
pub trait ActionContainer: TestAction {
    /// 声明顺序的子动作
    fn actions(&self) -> &[ActionRef];

    /// 已执行子动作的记录 (按声明顺序, 每个子动作最多一条)
    fn executed_actions(&self) -> Vec<ActionRecord>;

    fn action_count(&self) -> usize {
        self.actions().len()
    }
}

/// 容器构建器 trait
///
/// `TestRunner::container` 在作用域关闭时调用 `build`, 传入作用域内收集的子动作。
/// 构建期校验 (例如 assert 的子动作数量) 在这里报告。
pub trait ContainerBuilder {
    fn build(self, actions: Vec<ActionRef>) -> Result<ActionRef>;
}

/// 动作执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Success,
    Failed,
    Skipped,
}

/// 子动作执行记录
#[derive(Debug, Clone)]
pub struct ActionRecord {
    /// 声明顺序中的位置
    pub index: usize,

    /// 动作名称
    pub name: String,

    /// 最近一次执行的状态
    pub status: ActionStatus,

    /// 最近一次执行的错误
    pub error: Option<ExecutorError>,

    /// 执行次数 (循环容器中会大于 1)
    pub executions: usize,

    /// 累计耗时
    pub duration: Duration,
}

impl ActionRecord {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// 子动作执行日志
///
/// 每个声明位置一个槽位, 重复执行只更新已有记录。
#[derive(Debug)]
pub(crate) struct ChildLog {
    entries: Mutex<Vec<Option<ActionRecord>>>,
}

impl ChildLog {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            entries: Mutex::new(vec![None; len]),
        }
    }

    pub(crate) fn record(
        &self,
        index: usize,
        name: &str,
        status: ActionStatus,
        error: Option<ExecutorError>,
        elapsed: Duration,
    ) {
        let mut entries = self.entries.lock();
        let Some(slot) = entries.get_mut(index) else {
            return;
        };
        match slot {
            Some(record) => {
                record.status = status;
                record.error = error;
                record.executions += 1;
                record.duration += elapsed;
            }
            None => {
                *slot = Some(ActionRecord {
                    index,
                    name: name.to_string(),
                    status,
                    error,
                    executions: 1,
                    duration: elapsed,
                });
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<ActionRecord> {
        self.entries.lock().iter().flatten().cloned().collect()
    }
}

/// 容器公共部分: 名称、子动作、执行日志
///
/// 内置容器和自定义容器都通过它执行子动作并记录结果。
pub struct ContainerCore {
    name: String,
    description: Option<String>,
    actions: Vec<ActionRef>,
    log: ChildLog,
}

impl ContainerCore {
    pub fn new(name: impl Into<String>, actions: Vec<ActionRef>) -> Self {
        let log = ChildLog::new(actions.len());
        Self {
            name: name.into(),
            description: None,
            actions,
            log,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }

    pub fn executed_actions(&self) -> Vec<ActionRecord> {
        self.log.snapshot()
    }

    /// 执行指定位置的子动作并记录结果
    pub fn execute_child(&self, index: usize, context: &TestContext) -> Result<()> {
        let action = self.actions.get(index).ok_or_else(|| {
            ExecutorError::Configuration(format!(
                "容器 {} 没有第 {} 个子动作",
                self.name, index
            ))
        })?;

        if action.is_disabled(context) {
            debug!("跳过已禁用的动作: {}", action.name());
            self.log.record(
                index,
                action.name(),
                ActionStatus::Skipped,
                None,
                Duration::ZERO,
            );
            return Ok(());
        }

        let start_time = Instant::now();
        let result = action.execute(context);
        let elapsed = start_time.elapsed();

        match &result {
            Ok(()) => self
                .log
                .record(index, action.name(), ActionStatus::Success, None, elapsed),
            Err(e) => self.log.record(
                index,
                action.name(),
                ActionStatus::Failed,
                Some(e.clone()),
                elapsed,
            ),
        }

        result
    }

    /// 按声明顺序执行全部子动作, 第一个失败立即返回
    pub fn execute_children(&self, context: &TestContext) -> Result<()> {
        for index in 0..self.actions.len() {
            self.execute_child(index, context)?;
        }
        Ok(())
    }

    /// 记录未能正常执行的子动作 (例如线程崩溃)
    pub(crate) fn record_failure(&self, index: usize, error: &ExecutorError) {
        let name = self
            .actions
            .get(index)
            .map(|action| action.name().to_string())
            .unwrap_or_default();
        self.log.record(
            index,
            &name,
            ActionStatus::Failed,
            Some(error.clone()),
            Duration::ZERO,
        );
    }
}

impl fmt::Debug for ContainerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.actions.iter().map(|action| action.name()).collect();
        f.debug_struct("ContainerCore")
            .field("name", &self.name)
            .field("actions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::FnAction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(name: &str, counter: Arc<AtomicUsize>) -> ActionRef {
        Arc::new(FnAction::new(name, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    #[test]
    fn test_execute_children_records_each() {
        let counter = Arc::new(AtomicUsize::new(0));
        let core = ContainerCore::new(
            "core",
            vec![
                counting("a", counter.clone()),
                counting("b", counter.clone()),
            ],
        );

        core.execute_children(&TestContext::new()).unwrap();

        let records = core.executed_actions();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert!(records.iter().all(ActionRecord::is_success));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_repeated_execution_updates_record() {
        let counter = Arc::new(AtomicUsize::new(0));
        let core = ContainerCore::new("core", vec![counting("a", counter)]);
        let context = TestContext::new();

        for _ in 0..3 {
            core.execute_children(&context).unwrap();
        }

        let records = core.executed_actions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].executions, 3);
    }

    #[test]
    fn test_failure_is_recorded() {
        let core = ContainerCore::new(
            "core",
            vec![Arc::new(FnAction::new("boom", |_| {
                Err(ExecutorError::runtime("boom"))
            })) as ActionRef],
        );

        assert!(core.execute_children(&TestContext::new()).is_err());

        let records = core.executed_actions();
        assert_eq!(records[0].status, ActionStatus::Failed);
        assert_eq!(records[0].error.as_ref().unwrap().message(), "boom");
    }

    #[test]
    fn test_execute_child_out_of_range() {
        let core = ContainerCore::new("core", Vec::new());
        let result = core.execute_child(0, &TestContext::new());
        assert!(matches!(result, Err(ExecutorError::Configuration(_))));
    }
}
