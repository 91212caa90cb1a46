//! 模板注册表

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{ActionRef, ExecutorError, Result, Value};

/// 模板定义: 可复用的动作序列
pub struct TemplateDefinition {
    /// 模板名称
    pub name: String,

    /// 按顺序执行的动作
    pub actions: Vec<ActionRef>,

    /// 默认参数 (调用方同名参数覆盖)
    pub parameters: Vec<(String, Value)>,

    /// 是否共享调用方上下文
    pub global_context: bool,
}

impl TemplateDefinition {
    pub fn new(name: impl Into<String>, actions: Vec<ActionRef>) -> Self {
        Self {
            name: name.into(),
            actions,
            parameters: Vec::new(),
            global_context: true,
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn global_context(mut self, global_context: bool) -> Self {
        self.global_context = global_context;
        self
    }
}

impl fmt::Debug for TemplateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDefinition")
            .field("name", &self.name)
            .field("actions", &self.actions.len())
            .field("parameters", &self.parameters)
            .field("global_context", &self.global_context)
            .finish()
    }
}

/// 模板注册表
///
/// 管理所有已注册的模板
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<TemplateDefinition>>>,
}

impl TemplateRegistry {
    /// 创建新的模板注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模板
    pub fn register(&self, template: TemplateDefinition) -> Result<()> {
        info!("注册模板: {}", template.name);

        let mut templates = self.templates.write();

        if templates.contains_key(&template.name) {
            return Err(ExecutorError::Configuration(format!(
                "模板 {} 已注册",
                template.name
            )));
        }

        templates.insert(template.name.clone(), Arc::new(template));

        Ok(())
    }

    /// 注销模板
    pub fn unregister(&self, name: &str) -> Result<()> {
        info!("注销模板: {}", name);

        self.templates
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ExecutorError::TemplateNotFound(name.to_string()))
    }

    /// 按名称查找模板
    pub fn resolve(&self, name: &str) -> Result<Arc<TemplateDefinition>> {
        debug!("查找模板: {}", name);

        self.templates
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::TemplateNotFound(name.to_string()))
    }

    /// 列出所有已注册的模板 (按名称排序)
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 检查模板是否已注册
    pub fn is_registered(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }
}
