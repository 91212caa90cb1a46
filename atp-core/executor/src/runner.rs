//! 测试运行器
//!
//! 运行器是即时执行的构建器: 没有打开的容器时, 每个调用立即执行并记录到测试用例;
//! 容器调用先压入一个作用域, 在闭包中收集子动作, 弹出作用域后构建容器,
//! 再执行 (或交给外层作用域)。子动作总是进入作用域栈的栈顶,
//! 所以多层嵌套的容器都能挂到正确的父容器上。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::container::{
    AssertBuilder, CatchBuilder, ConditionalBuilder, IterateBuilder, ParallelBuilder,
    RepeatBuilder, RepeatOnErrorBuilder, SequenceBuilder, TemplateBuilder,
};
use crate::test_case::set_substituted;
use crate::{
    ActionRef, ContainerBuilder, CreateVariablesAction, EchoAction, ExecutorConfig,
    ExecutorError, FailAction, FnAction, Result, RunnerConfig, SleepAction, StopTimeAction,
    TemplateRegistry, TestCase, TestContext, TestResult, TraceVariablesAction, Value,
};

/// 测试运行器
pub struct TestRunner {
    /// 测试用例
    test_case: TestCase,

    /// 共享上下文
    context: TestContext,

    /// 运行器配置
    config: RunnerConfig,

    /// 模板注册表
    templates: Arc<TemplateRegistry>,

    /// 作用域栈: 每个打开的容器一层, 收集其子动作
    scopes: Vec<Vec<ActionRef>>,
}

impl TestRunner {
    /// 创建新的测试运行器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            test_case: TestCase::new(name),
            context: TestContext::new(),
            config: RunnerConfig::default(),
            templates: Arc::new(TemplateRegistry::new()),
            scopes: Vec::new(),
        }
    }

    /// 应用执行器配置, 全局变量写入上下文
    pub fn with_config(mut self, config: &ExecutorConfig) -> Result<Self> {
        self.config = config.runner.clone();
        self.seed_global_variables()?;
        Ok(self)
    }

    /// 设置模板注册表
    pub fn with_templates(mut self, templates: Arc<TemplateRegistry>) -> Self {
        self.templates = templates;
        self
    }

    /// 设置上下文 (例如自定义表达式求值器)
    ///
    /// 已应用配置的全局变量会写入新上下文。
    pub fn with_context(mut self, context: TestContext) -> Result<Self> {
        self.context = context;
        self.seed_global_variables()?;
        Ok(self)
    }

    fn seed_global_variables(&self) -> Result<()> {
        for (name, value) in &self.config.global_variables {
            self.context.set_variable(name, value.as_str())?;
        }
        Ok(())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.test_case.set_description(description);
        self
    }

    // ============================================
    // 生命周期
    // ============================================

    /// 开始测试 (第一次执行动作时也会自动开始)
    pub fn start(&mut self) -> Result<()> {
        self.test_case.start(&self.context)
    }

    /// 结束测试, 执行 finally 动作
    ///
    /// 测试失败时返回失败原因, 详细结果见 [`TestCase::result`]。
    pub fn stop(&mut self) -> Result<()> {
        if !self.scopes.is_empty() {
            return Err(ExecutorError::Configuration(format!(
                "仍有 {} 个容器未关闭",
                self.scopes.len()
            )));
        }

        match self.test_case.finish(&self.context) {
            TestResult::Failed(cause) => Err(cause),
            TestResult::Success | TestResult::Skipped => Ok(()),
        }
    }

    /// 定义测试变量 (字符串值做 `${}` 替换)
    pub fn variable(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.test_case.is_started() {
            set_substituted(&self.context, name, &value).map_err(|e| self.fail_at_root(e))?;
        }
        self.test_case.add_variable(name, value);
        Ok(())
    }

    // ============================================
    // 叶子动作
    // ============================================

    /// 执行 (或在打开的容器中登记) 任意动作
    pub fn run(&mut self, action: ActionRef) -> Result<()> {
        let depth = self.scopes.len();
        match self.scopes.last_mut() {
            Some(scope) => {
                debug!("登记子动作: {} (深度 {})", action.name(), depth);
                scope.push(action);
                Ok(())
            }
            None => self.test_case.execute_action(action, &self.context),
        }
    }

    pub fn echo(&mut self, message: impl Into<String>) -> Result<()> {
        self.run(Arc::new(EchoAction::new(message)))
    }

    pub fn create_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.run(Arc::new(CreateVariablesAction::new().variable(name, value)))
    }

    pub fn sleep(&mut self, duration: Duration) -> Result<()> {
        self.run(Arc::new(SleepAction::new(duration)))
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.run(Arc::new(FailAction::new(message)))
    }

    pub fn stop_time(&mut self, id: impl Into<String>) -> Result<()> {
        self.run(Arc::new(StopTimeAction::new(id)))
    }

    pub fn trace_variables(&mut self) -> Result<()> {
        self.run(Arc::new(TraceVariablesAction::new()))
    }

    /// 闭包动作
    pub fn action<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(&TestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.run(Arc::new(FnAction::new(name, func)))
    }

    // ============================================
    // 容器
    // ============================================

    /// 通用容器入口
    ///
    /// 闭包中的调用都登记到新作用域; 闭包返回后 (无论成功与否) 作用域弹出,
    /// 构建错误在这里返回, 然后执行容器或交给外层作用域。
    /// 最外层容器的闭包错误和构建错误记为测试失败。
    pub fn container<B, F>(&mut self, builder: B, body: F) -> Result<()>
    where
        B: ContainerBuilder,
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.scopes.push(Vec::new());
        let outcome = body(self);
        let children = self.scopes.pop().unwrap_or_default();

        let container = outcome
            .and_then(|()| builder.build(children))
            .map_err(|e| self.fail_at_root(e))?;
        self.run(container)
    }

    pub fn sequential<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(SequenceBuilder::new(), body)
    }

    pub fn parallel<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        let builder =
            ParallelBuilder::new().default_thread_prefix(&self.config.parallel_thread_prefix);
        self.container(builder, body)
    }

    pub fn repeat<F>(&mut self, builder: RepeatBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(builder, body)
    }

    pub fn repeat_on_error<F>(&mut self, builder: RepeatOnErrorBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        let auto_sleep = Duration::from_millis(self.config.repeat_on_error_sleep_ms);
        self.container(builder.default_auto_sleep(auto_sleep), body)
    }

    pub fn iterate<F>(&mut self, builder: IterateBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(builder, body)
    }

    pub fn conditional<F>(&mut self, builder: ConditionalBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(builder, body)
    }

    pub fn catch_exception<F>(&mut self, builder: CatchBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(builder, body)
    }

    pub fn assert_exception<F>(&mut self, builder: AssertBuilder, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.container(builder, body)
    }

    /// 应用模板 (模板从运行器的注册表解析)
    pub fn apply_template(&mut self, builder: TemplateBuilder) -> Result<()> {
        let builder = builder.defaults(&self.templates, self.config.template_global_context);
        self.container(builder, |_| Ok(()))
    }

    /// 注册 finally 动作, 在 [`TestRunner::stop`] 时执行
    pub fn do_finally<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut TestRunner) -> Result<()>,
    {
        self.scopes.push(Vec::new());
        let outcome = body(self);
        let actions = self.scopes.pop().unwrap_or_default();
        outcome.map_err(|e| self.fail_at_root(e))?;

        info!("注册 {} 个 finally 动作", actions.len());
        for action in actions {
            self.test_case.add_final_action(action);
        }
        Ok(())
    }

    /// 没有打开的作用域时, 错误不会再被外层容器处理, 直接记为测试失败
    fn fail_at_root(&mut self, error: ExecutorError) -> ExecutorError {
        if self.scopes.is_empty() {
            self.test_case.fail(error.clone());
        }
        error
    }

    // ============================================
    // 查询
    // ============================================

    pub fn test_case(&self) -> &TestCase {
        &self.test_case
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// 当前打开的容器层数
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }
}
