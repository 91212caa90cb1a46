//! 条件表达式求值
//!
//! 循环与条件容器通过 [`ExpressionEvaluator`] 判断字符串形式的条件。
//! 默认实现 [`RhaiExpressionEvaluator`] 的处理顺序:
//! 1. 将文本运算符 (`lt` `gt` `le` `ge` `eq` `ne` `and` `or`) 与单个 `=` 改写为 rhai 运算符
//! 2. 替换 `${name}` 占位符
//! 3. 把上下文变量和调用方绑定 (例如循环索引) 放入 rhai 作用域后求值

use std::sync::OnceLock;

use regex::{Captures, Regex};
use rhai::{Dynamic, Engine, Scope, FLOAT, INT};
use serde_json::Value;
use tracing::debug;

use crate::{ContextError, Result, TestContext};

/// 表达式求值器
///
/// 所有实现必须是线程安全的, 并行容器中的子动作会同时求值。
pub trait ExpressionEvaluator: Send + Sync {
    /// 求值布尔表达式
    fn evaluate(
        &self,
        expression: &str,
        bindings: &[(&str, i64)],
        context: &TestContext,
    ) -> Result<bool>;
}

/// 基于 rhai 的表达式求值器
#[derive(Debug, Default, Clone, Copy)]
pub struct RhaiExpressionEvaluator;

impl RhaiExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// 改写文本运算符
    ///
    /// 引号内的字符串字面量原样保留, 只改写字面量之间的部分。
    pub fn rewrite_operators(expression: &str) -> String {
        static QUOTED_LITERAL: OnceLock<Regex> = OnceLock::new();

        let literals = QUOTED_LITERAL.get_or_init(|| {
            Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#)
                .expect("literal regex should compile")
        });

        let mut rewritten = String::with_capacity(expression.len());
        let mut last = 0;
        for literal in literals.find_iter(expression) {
            rewritten.push_str(&rewrite_segment(&expression[last..literal.start()]));
            rewritten.push_str(literal.as_str());
            last = literal.end();
        }
        rewritten.push_str(&rewrite_segment(&expression[last..]));
        rewritten
    }

    fn build_scope(bindings: &[(&str, i64)], context: &TestContext) -> Scope<'static> {
        let mut scope = Scope::new();

        for (name, value) in context.variables() {
            if is_identifier(&name) {
                scope.push_dynamic(name, value_to_dynamic(&value));
            }
        }

        // 后压入的同名变量会遮蔽上下文变量
        for (name, value) in bindings {
            scope.push_dynamic(name.to_string(), Dynamic::from(*value as INT));
        }

        scope
    }
}

impl ExpressionEvaluator for RhaiExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &[(&str, i64)],
        context: &TestContext,
    ) -> Result<bool> {
        let rewritten = Self::rewrite_operators(expression);
        let source = context.replace_dynamic_content(&rewritten)?;
        let mut scope = Self::build_scope(bindings, context);

        let engine = Engine::new();
        let result = engine
            .eval_with_scope::<bool>(&mut scope, &source)
            .map_err(|error| ContextError::Expression {
                expression: expression.to_string(),
                message: error.to_string(),
            })?;

        debug!("条件表达式 '{}' ({}) => {}", expression, source, result);
        Ok(result)
    }
}

/// 改写不含字符串字面量的表达式片段
fn rewrite_segment(segment: &str) -> String {
    static WORD_OPERATORS: OnceLock<Regex> = OnceLock::new();
    static SINGLE_EQUALS: OnceLock<Regex> = OnceLock::new();

    let words = WORD_OPERATORS.get_or_init(|| {
        Regex::new(r"\b(lt|gt|le|ge|eq|ne|and|or)\b").expect("operator regex should compile")
    });
    let equals = SINGLE_EQUALS.get_or_init(|| {
        Regex::new(r"(^|[^=!<>])=($|[^=])").expect("equals regex should compile")
    });

    let rewritten = words.replace_all(segment, |captures: &Captures<'_>| {
        match &captures[1] {
            "lt" => "<",
            "gt" => ">",
            "le" => "<=",
            "ge" => ">=",
            "eq" => "==",
            "ne" => "!=",
            "and" => "&&",
            _ => "||",
        }
        .to_string()
    });

    equals.replace_all(&rewritten, "${1}==${2}").into_owned()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from(i as INT),
            None => Dynamic::from(n.as_f64().unwrap_or_default() as FLOAT),
        },
        Value::String(s) => string_to_dynamic(s),
        Value::Null => Dynamic::UNIT,
        other => Dynamic::from(other.to_string()),
    }
}

/// 字符串变量按整数 / 浮点 / 布尔的顺序尝试解析
fn string_to_dynamic(s: &str) -> Dynamic {
    if let Ok(i) = s.parse::<INT>() {
        return Dynamic::from(i);
    }
    if let Ok(f) = s.parse::<FLOAT>() {
        return Dynamic::from(f);
    }
    match s {
        "true" => Dynamic::from(true),
        "false" => Dynamic::from(false),
        _ => Dynamic::from(s.to_string()),
    }
}
