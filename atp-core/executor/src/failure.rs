//! 失败类型
//!
//! 失败类型是以 `.` 分隔的层级标识, 例如 `runtime.validation`。
//! `catch` / `assert` 容器按 "相同或更具体" 匹配: `runtime.validation`
//! 属于 `runtime`, 反之不成立。

use std::borrow::Cow;
use std::fmt;

/// 层级失败类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailureKind(Cow<'static, str>);

impl FailureKind {
    /// 通用运行时失败 (默认类型)
    pub const RUNTIME: FailureKind = FailureKind(Cow::Borrowed("runtime"));

    /// 校验失败
    pub const VALIDATION: FailureKind = FailureKind(Cow::Borrowed("runtime.validation"));

    /// 期望未满足 (assert 容器)
    pub const EXPECTATION: FailureKind =
        FailureKind(Cow::Borrowed("runtime.validation.expectation"));

    /// 变量解析失败
    pub const VARIABLE: FailureKind = FailureKind(Cow::Borrowed("runtime.variable"));

    /// 条件表达式求值失败
    pub const EXPRESSION: FailureKind = FailureKind(Cow::Borrowed("runtime.expression"));

    /// 构建期配置错误, 不属于 `runtime`
    pub const CONFIGURATION: FailureKind = FailureKind(Cow::Borrowed("configuration"));

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// 派生子类型: `runtime` + `timeout` => `runtime.timeout`
    pub fn child(&self, segment: &str) -> Self {
        Self::new(format!("{}.{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否为 `other` 本身或其子类型
    pub fn is_a(&self, other: &FailureKind) -> bool {
        let this = self.as_str();
        let base = other.as_str();
        this == base
            || (this.len() > base.len()
                && this.starts_with(base)
                && this.as_bytes()[base.len()] == b'.')
    }
}

impl Default for FailureKind {
    fn default() -> Self {
        Self::RUNTIME
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FailureKind {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 动作执行失败 (类型 + 消息)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
