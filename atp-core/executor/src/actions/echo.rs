use tracing::info;

use crate::{Result, TestAction, TestContext};

/// 输出消息 (支持 `${}` 占位符)
#[derive(Debug, Clone)]
pub struct EchoAction {
    message: String,
}

impl EchoAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TestAction for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let message = context.replace_dynamic_content(&self.message)?;
        info!("{}", message);
        Ok(())
    }
}
