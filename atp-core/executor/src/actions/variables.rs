use atp_context::value_to_string;
use tracing::{debug, info};

use crate::{Result, TestAction, TestContext, Value};

/// 创建 (或覆盖) 变量
///
/// 字符串值在写入前做 `${}` 替换, 结构化值原样写入。
#[derive(Debug, Clone, Default)]
pub struct CreateVariablesAction {
    variables: Vec<(String, Value)>,
}

impl CreateVariablesAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }
}

impl TestAction for CreateVariablesAction {
    fn name(&self) -> &str {
        "create-variables"
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        for (name, value) in &self.variables {
            let value = match value {
                Value::String(s) => Value::String(context.replace_dynamic_content(s)?),
                other => other.clone(),
            };
            debug!("创建变量: {} = {}", name, value_to_string(&value));
            context.set_variable(name, value)?;
        }
        Ok(())
    }
}

/// 输出变量 (默认输出全部可见变量)
#[derive(Debug, Clone, Default)]
pub struct TraceVariablesAction {
    names: Vec<String>,
}

impl TraceVariablesAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }
}

impl TestAction for TraceVariablesAction {
    fn name(&self) -> &str {
        "trace-variables"
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        if self.names.is_empty() {
            for (name, value) in context.variables() {
                info!("变量: {} = {}", name, value_to_string(&value));
            }
            return Ok(());
        }

        for name in &self.names {
            let value = context.get_string(name)?;
            info!("变量: {} = {}", name, value);
        }
        Ok(())
    }
}
