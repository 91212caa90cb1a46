use std::fmt;

use crate::{Result, TestAction, TestContext};

type ActionFn = dyn Fn(&TestContext) -> Result<()> + Send + Sync;

/// 闭包动作
///
/// 外部协作者 (消息收发、编排客户端等) 以闭包形式接入执行引擎。
pub struct FnAction {
    name: String,
    description: Option<String>,
    disabled: bool,
    func: Box<ActionFn>,
}

impl FnAction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&TestContext) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            disabled: false,
            func: Box::new(func),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 标记为禁用, 执行时跳过
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl TestAction for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        (self.func)(context)
    }

    fn is_disabled(&self, _context: &TestContext) -> bool {
        self.disabled
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .field("disabled", &self.disabled)
            .finish()
    }
}
