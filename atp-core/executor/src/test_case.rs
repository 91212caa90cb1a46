//! 测试用例
//!
//! 测试用例是执行树的根: 按顺序记录顶层动作, 维护当前 / 最近执行的动作,
//! 在结束时执行 finally 动作并给出最终结果。

use std::fmt;
use std::time::{Duration, Instant};

use atp_context::TEST_NAME_VARIABLE;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::report::{ExecutionReport, StepReport};
use crate::{ActionRecord, ActionRef, ActionStatus, ExecutorError, Result, TestContext, Value};

/// 测试结果
#[derive(Debug, Clone)]
pub enum TestResult {
    Success,
    Failed(ExecutorError),
    Skipped,
}

impl TestResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TestResult::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestResult::Failed(_))
    }

    /// 失败原因
    pub fn cause(&self) -> Option<&ExecutorError> {
        match self {
            TestResult::Failed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// 测试用例
pub struct TestCase {
    name: String,
    description: Option<String>,
    variables: Vec<(String, Value)>,
    actions: Vec<ActionRef>,
    records: Vec<ActionRecord>,
    final_actions: Vec<ActionRef>,
    active_action: Option<ActionRef>,
    last_executed_action: Option<ActionRef>,
    result: Option<TestResult>,
    started_at: Option<DateTime<Utc>>,
    start_time: Option<Instant>,
    duration: Duration,
    finished: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: Vec::new(),
            actions: Vec::new(),
            records: Vec::new(),
            final_actions: Vec::new(),
            active_action: None,
            last_executed_action: None,
            result: None,
            started_at: None,
            start_time: None,
            duration: Duration::ZERO,
            finished: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// 定义测试变量 (在 `start` 时替换并写入上下文)
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.push((name.into(), value.into()));
    }

    /// 注册 finally 动作
    pub fn add_final_action(&mut self, action: ActionRef) {
        self.final_actions.push(action);
    }

    /// 开始测试: 写入内置变量和测试变量
    pub fn start(&mut self, context: &TestContext) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }

        info!("开始执行测试: {}", self.name);
        self.started_at = Some(Utc::now());
        self.start_time = Some(Instant::now());

        // 初始化失败即测试失败, 之后的动作直接返回该原因
        if let Err(e) = self.initialize_variables(context) {
            self.fail(e.clone());
            return Err(e);
        }
        Ok(())
    }

    fn initialize_variables(&self, context: &TestContext) -> Result<()> {
        context.set_variable(TEST_NAME_VARIABLE, self.name.as_str())?;
        for (name, value) in &self.variables {
            set_substituted(context, name, value)?;
        }
        Ok(())
    }

    /// 记录不经过动作执行产生的失败 (例如容器构建错误、变量初始化失败)
    ///
    /// 已经失败的测试保留第一次失败的原因; 已结束的测试不再改变结果。
    pub fn fail(&mut self, cause: ExecutorError) {
        if self.finished || matches!(self.result, Some(TestResult::Failed(_))) {
            return;
        }
        error!("测试 {} 失败: {}", self.name, cause);
        self.result = Some(TestResult::Failed(cause));
    }

    /// 执行一个顶层动作并记录
    ///
    /// 测试已失败时不再执行新动作, 直接返回之前的失败原因。
    pub fn execute_action(&mut self, action: ActionRef, context: &TestContext) -> Result<()> {
        if self.finished {
            return Err(ExecutorError::Configuration(format!(
                "测试 {} 已结束, 不能继续执行动作",
                self.name
            )));
        }
        if let Some(TestResult::Failed(cause)) = &self.result {
            debug!("测试已失败, 忽略动作: {}", action.name());
            return Err(cause.clone());
        }
        self.start(context)?;

        let index = self.actions.len();
        self.actions.push(action.clone());

        if action.is_disabled(context) {
            info!("跳过已禁用的动作: {}", action.name());
            self.records.push(record(
                index,
                &action,
                ActionStatus::Skipped,
                None,
                Duration::ZERO,
            ));
            return Ok(());
        }

        self.active_action = Some(action.clone());
        let start_time = Instant::now();
        let result = action.execute(context);
        let elapsed = start_time.elapsed();
        self.active_action = None;

        match &result {
            Ok(()) => {
                debug!("动作完成: {} ({:?})", action.name(), elapsed);
                self.records
                    .push(record(index, &action, ActionStatus::Success, None, elapsed));
            }
            Err(e) => {
                error!("动作 {} 执行失败: {}", action.name(), e);
                self.records.push(record(
                    index,
                    &action,
                    ActionStatus::Failed,
                    Some(e.clone()),
                    elapsed,
                ));
                self.result = Some(TestResult::Failed(e.clone()));
            }
        }

        self.last_executed_action = Some(action);
        result
    }

    /// 结束测试: 执行 finally 动作并计算最终结果
    ///
    /// finally 动作无论测试成功与否都会执行, 其失败会让原本成功的测试失败。
    pub fn finish(&mut self, context: &TestContext) -> TestResult {
        if self.finished {
            return self.result.clone().unwrap_or(TestResult::Skipped);
        }

        if !self.final_actions.is_empty() {
            debug!("执行 {} 个 finally 动作", self.final_actions.len());
        }
        for action in &self.final_actions {
            if action.is_disabled(context) {
                continue;
            }
            if let Err(e) = action.execute(context) {
                warn!("finally 动作 {} 执行失败: {}", action.name(), e);
                if !matches!(self.result, Some(TestResult::Failed(_))) {
                    self.result = Some(TestResult::Failed(e));
                }
            }
        }

        let result = match self.result.take() {
            Some(result) => result,
            None if self.is_started() => TestResult::Success,
            None => TestResult::Skipped,
        };

        self.duration = self
            .start_time
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.finished = true;

        match &result {
            TestResult::Success => info!("测试 {} 通过 ({:?})", self.name, self.duration),
            TestResult::Failed(e) => error!("测试 {} 失败: {}", self.name, e),
            TestResult::Skipped => info!("测试 {} 已跳过", self.name),
        }

        self.result = Some(result.clone());
        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 已执行的顶层动作 (按执行顺序)
    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }

    /// 顶层动作的执行记录
    pub fn executed_actions(&self) -> &[ActionRecord] {
        &self.records
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn final_actions(&self) -> &[ActionRef] {
        &self.final_actions
    }

    /// 正在执行的顶层动作
    ///
    /// 只跟踪测试用例直接执行的动作: 容器执行期间这里是容器本身,
    /// 容器内部的进度通过 [`ActionContainer::executed_actions`](crate::ActionContainer::executed_actions) 查看。
    pub fn active_action(&self) -> Option<&ActionRef> {
        self.active_action.as_ref()
    }

    /// 最近执行的顶层动作 (同样不深入容器内部)
    pub fn last_executed_action(&self) -> Option<&ActionRef> {
        self.last_executed_action.as_ref()
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 生成执行报告
    pub fn report(&self) -> ExecutionReport {
        let mut report = ExecutionReport::new(&self.name);
        report.description = self.description.clone();
        report.started_at = self.started_at;

        for record in &self.records {
            report.add_step(StepReport::from_record(record, self.actions.get(record.index)));
        }

        report.duration_ms = self.duration.as_millis() as u64;
        if let Some(TestResult::Failed(cause)) = &self.result {
            report.passed = false;
            report.error = Some(cause.to_string());
        }
        report
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.actions.iter().map(|action| action.name()).collect();
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("actions", &names)
            .field("result", &self.result)
            .field("finished", &self.finished)
            .finish()
    }
}

fn record(
    index: usize,
    action: &ActionRef,
    status: ActionStatus,
    error: Option<ExecutorError>,
    duration: Duration,
) -> ActionRecord {
    ActionRecord {
        index,
        name: action.name().to_string(),
        status,
        error,
        executions: 1,
        duration,
    }
}

/// 字符串值先做 `${}` 替换再写入
pub(crate) fn set_substituted(context: &TestContext, name: &str, value: &Value) -> Result<()> {
    let value = match value {
        Value::String(s) => Value::String(context.replace_dynamic_content(s)?),
        other => other.clone(),
    };
    context.set_variable(name, value)?;
    Ok(())
}
