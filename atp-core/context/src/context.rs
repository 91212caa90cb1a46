//! 测试上下文
//!
//! 一个测试用例共享同一个 [`TestContext`]。克隆只复制内部的 `Arc`,
//! 所有克隆指向同一份变量存储, 因此可以直接交给并行执行的子动作。
//!
//! 子作用域 ([`TestContext::child_scope`]) 叠加在父作用域之上:
//! 本地未定义的变量从父作用域读取, 写入只落在本地, 子作用域丢弃后父作用域不受影响。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::expression::{ExpressionEvaluator, RhaiExpressionEvaluator};
use crate::timers::TimerRegistry;
use crate::{substitution, ContextError, Result};

/// 测试名称内置变量
pub const TEST_NAME_VARIABLE: &str = "atp.test.name";

/// 单层变量作用域
struct Scope {
    variables: RwLock<HashMap<String, Value>>,
    parent: Option<TestContext>,
}

/// 测试上下文 (线程安全, 可廉价克隆)
#[derive(Clone)]
pub struct TestContext {
    scope: Arc<Scope>,
    timers: Arc<TimerRegistry>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl TestContext {
    /// 创建新的根上下文 (使用 rhai 表达式求值器)
    pub fn new() -> Self {
        Self {
            scope: Arc::new(Scope {
                variables: RwLock::new(HashMap::new()),
                parent: None,
            }),
            timers: Arc::new(TimerRegistry::new()),
            evaluator: Arc::new(RhaiExpressionEvaluator::new()),
        }
    }

    /// 设置表达式求值器
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// 创建叠加在当前上下文之上的子作用域
    ///
    /// 子作用域共享计时器注册表和表达式求值器。
    pub fn child_scope(&self) -> Self {
        Self {
            scope: Arc::new(Scope {
                variables: RwLock::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
            timers: Arc::clone(&self.timers),
            evaluator: Arc::clone(&self.evaluator),
        }
    }

    /// 是否为子作用域
    pub fn is_child_scope(&self) -> bool {
        self.scope.parent.is_some()
    }

    /// 设置变量 (最后一次写入生效)
    ///
    /// 变量名可以带 `${}` 包裹, 写入时会去掉。
    pub fn set_variable(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let key = normalize_name(name)?;
        let value = value.into();
        debug!("设置变量: {} = {}", key, value_to_string(&value));
        self.scope.variables.write().insert(key.to_string(), value);
        Ok(())
    }

    /// 读取变量, 本地未定义时回落到父作用域
    pub fn get_variable(&self, name: &str) -> Result<Value> {
        let key = normalize_name(name)?;
        self.lookup(key)
            .ok_or_else(|| ContextError::UnknownVariable(key.to_string()))
    }

    /// 以字符串形式读取变量
    pub fn get_string(&self, name: &str) -> Result<String> {
        self.get_variable(name).map(|value| value_to_string(&value))
    }

    /// 检查变量是否可见 (包括父作用域)
    pub fn contains_variable(&self, name: &str) -> bool {
        match normalize_name(name) {
            Ok(key) => self.lookup(key).is_some(),
            Err(_) => false,
        }
    }

    /// 删除本地作用域中的变量
    pub fn remove_variable(&self, name: &str) -> Option<Value> {
        let key = normalize_name(name).ok()?;
        self.scope.variables.write().remove(key)
    }

    /// 当前可见的全部变量快照 (本地覆盖父作用域)
    pub fn variables(&self) -> BTreeMap<String, Value> {
        let mut merged = match &self.scope.parent {
            Some(parent) => parent.variables(),
            None => BTreeMap::new(),
        };
        for (name, value) in self.scope.variables.read().iter() {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    /// 仅本地作用域的变量快照
    pub fn local_variables(&self) -> BTreeMap<String, Value> {
        self.scope
            .variables
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// 替换字符串中的 `${name}` 占位符
    pub fn replace_dynamic_content(&self, input: &str) -> Result<String> {
        substitution::replace_variables(input, |name| self.get_string(name))
    }

    /// 求值布尔表达式
    ///
    /// `bindings` 中的整数绑定 (例如循环索引) 优先于同名的上下文变量。
    pub fn evaluate(&self, expression: &str, bindings: &[(&str, i64)]) -> Result<bool> {
        self.evaluator.evaluate(expression, bindings, self)
    }

    /// 计时器 / 计数器注册表
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.scope.variables.read().get(key) {
            return Some(value.clone());
        }
        self.scope.parent.as_ref().and_then(|parent| parent.lookup(key))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("variables", &self.local_variables())
            .field("child_scope", &self.is_child_scope())
            .finish()
    }
}

/// 变量值转字符串: 字符串原样返回, 其他值使用 JSON 表示
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let key = trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(trimmed);

    if key.is_empty() {
        return Err(ContextError::InvalidVariableName(name.to_string()));
    }
    Ok(key)
}
