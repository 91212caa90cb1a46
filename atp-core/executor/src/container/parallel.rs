use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, Result,
    TestAction, TestContext,
};

/// 默认线程名前缀
pub(crate) const DEFAULT_THREAD_PREFIX: &str = "atp-parallel";

/// 并行容器
///
/// 每个子动作一个线程, 共享同一个上下文。等待全部子动作结束后,
/// 若有失败则返回声明顺序中第一个失败。没有取消: 一个子动作失败不会中断其他子动作。
#[derive(Debug)]
pub struct Parallel {
    pub(super) core: ContainerCore,
    thread_prefix: String,
}

impl Parallel {
    pub fn new(name: impl Into<String>, actions: Vec<ActionRef>) -> Self {
        Self {
            core: ContainerCore::new(name, actions),
            thread_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }

    pub fn builder() -> ParallelBuilder {
        ParallelBuilder::default()
    }

    pub fn thread_prefix(&self) -> &str {
        &self.thread_prefix
    }

    fn run_all(&self, context: &TestContext) -> Vec<Result<()>> {
        let core = &self.core;

        thread::scope(|scope| {
            let handles: Vec<_> = (0..core.actions().len())
                .map(|index| {
                    thread::Builder::new()
                        .name(format!("{}-{}", self.thread_prefix, index))
                        .spawn_scoped(scope, move || core.execute_child(index, context))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    let error = match handle {
                        Ok(handle) => match handle.join() {
                            Ok(result) => return result,
                            Err(_) => ExecutorError::runtime(format!(
                                "并行子动作 {} 异常退出",
                                index
                            )),
                        },
                        Err(e) => ExecutorError::runtime(format!(
                            "启动并行子动作 {} 失败: {}",
                            index, e
                        )),
                    };
                    core.record_failure(index, &error);
                    Err(error)
                })
                .collect()
        })
    }
}

impl TestAction for Parallel {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn description(&self) -> Option<&str> {
        self.core.description()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        debug!("并行执行 {} 个动作: {}", self.core.actions().len(), self.name());

        let results = self.run_all(context);
        let failures = results.iter().filter(|result| result.is_err()).count();
        if failures > 0 {
            warn!("并行容器 {} 中 {} 个动作失败", self.name(), failures);
        }

        results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 并行容器构建器
#[derive(Default)]
pub struct ParallelBuilder {
    name: Option<String>,
    thread_prefix: Option<String>,
    actions: Vec<ActionRef>,
}

impl ParallelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 工作线程名前缀, 线程名为 `<prefix>-<index>`
    pub fn thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = Some(prefix.into());
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub(crate) fn default_thread_prefix(mut self, prefix: &str) -> Self {
        self.thread_prefix.get_or_insert_with(|| prefix.to_string());
        self
    }
}

impl ContainerBuilder for ParallelBuilder {
    fn build(mut self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        self.actions.extend(actions);
        Ok(Arc::new(Parallel {
            core: ContainerCore::new(
                self.name.unwrap_or_else(|| "parallel".to_string()),
                self.actions,
            ),
            thread_prefix: self
                .thread_prefix
                .unwrap_or_else(|| DEFAULT_THREAD_PREFIX.to_string()),
        }))
    }
}
