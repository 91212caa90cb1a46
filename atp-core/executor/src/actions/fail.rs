use crate::{ExecutorError, FailureKind, Result, TestAction, TestContext};

/// 总是失败的动作
#[derive(Debug, Clone)]
pub struct FailAction {
    kind: FailureKind,
    message: String,
}

impl FailAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::RUNTIME,
            message: message.into(),
        }
    }

    /// 设置失败类型 (默认 `runtime`)
    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }
}

impl TestAction for FailAction {
    fn name(&self) -> &str {
        "fail"
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let message = context.replace_dynamic_content(&self.message)?;
        Err(ExecutorError::failed(self.kind.clone(), message))
    }
}
