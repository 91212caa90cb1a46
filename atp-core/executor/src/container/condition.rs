//! 循环与条件容器的判定条件

use std::fmt;
use std::sync::Arc;

use crate::{Result, TestContext};

type IterationFn = dyn Fn(i64, &TestContext) -> bool + Send + Sync;
type ConditionFn = dyn Fn(&TestContext) -> bool + Send + Sync;

/// 循环条件
///
/// 表达式形式中, 循环索引同时以索引变量名和 `index` 两个名字绑定。
#[derive(Clone)]
pub enum IterationCondition {
    /// 布尔表达式, 例如 `i lt 5` / `index >= 5`
    Expression(String),

    /// 回调, 参数为当前索引和上下文
    Callback(Arc<IterationFn>),
}

impl IterationCondition {
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression(expression.into())
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(i64, &TestContext) -> bool + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(callback))
    }

    /// 以给定索引求值
    pub fn evaluate(&self, index_name: &str, index: i64, context: &TestContext) -> Result<bool> {
        match self {
            Self::Expression(expression) => {
                Ok(context.evaluate(expression, &[("index", index), (index_name, index)])?)
            }
            Self::Callback(callback) => Ok(callback(index, context)),
        }
    }
}

impl fmt::Debug for IterationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(expression) => f.debug_tuple("Expression").field(expression).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

impl From<&str> for IterationCondition {
    fn from(expression: &str) -> Self {
        Self::expression(expression)
    }
}

/// 执行条件
#[derive(Clone)]
pub enum Condition {
    Expression(String),
    Callback(Arc<ConditionFn>),
}

impl Condition {
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression(expression.into())
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&TestContext) -> bool + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(callback))
    }

    pub fn evaluate(&self, context: &TestContext) -> Result<bool> {
        match self {
            Self::Expression(expression) => Ok(context.evaluate(expression, &[])?),
            Self::Callback(callback) => Ok(callback(context)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(expression) => f.debug_tuple("Expression").field(expression).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

impl From<&str> for Condition {
    fn from(expression: &str) -> Self {
        Self::expression(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutorError, FailureKind};

    #[test]
    fn test_iteration_expression_bindings() {
        let context = TestContext::new();
        let by_name = IterationCondition::expression("i ge 3");
        let by_index = IterationCondition::expression("index ge 3");

        assert!(by_name.evaluate("i", 3, &context).unwrap());
        assert!(!by_index.evaluate("i", 2, &context).unwrap());
    }

    #[test]
    fn test_iteration_callback() {
        let condition = IterationCondition::callback(|index, _| index > 5);
        assert!(condition.evaluate("i", 6, &TestContext::new()).unwrap());
    }

    #[test]
    fn test_condition_expression_error_kind() {
        let error = Condition::expression("1 +")
            .evaluate(&TestContext::new())
            .unwrap_err();
        assert!(matches!(error, ExecutorError::Context(_)));
        assert_eq!(error.kind(), FailureKind::EXPRESSION);
    }

    #[test]
    fn test_condition_uses_context() {
        let context = TestContext::new();
        context.set_variable("mode", "fast").unwrap();
        assert!(Condition::from("${mode} = fast").evaluate(&context).is_err());
        assert!(Condition::from("mode = \"fast\"").evaluate(&context).unwrap());
    }
}
