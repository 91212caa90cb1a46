//! 模板容器
//!
//! 模板在构建时从 [`TemplateRegistry`] 解析。注册的默认参数与调用方参数合并
//! (调用方覆盖), 执行前逐个写入上下文。`global_context = false` 时在子作用域中执行,
//! 模板内写入的变量在容器结束后丢弃。

use std::sync::Arc;

use atp_context::value_to_string;
use tracing::{debug, info};

use crate::{
    ActionContainer, ActionRef, ContainerBuilder, ContainerCore, ExecutorError, Result,
    TemplateRegistry, TestAction, TestContext, Value,
};

/// 模板容器
#[derive(Debug)]
pub struct Template {
    pub(super) core: ContainerCore,
    template_name: String,
    parameters: Vec<(String, Value)>,
    global_context: bool,
}

impl Template {
    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(name)
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn parameters(&self) -> &[(String, Value)] {
        &self.parameters
    }

    pub fn is_global_context(&self) -> bool {
        self.global_context
    }
}

impl TestAction for Template {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        info!("执行模板: {}", self.template_name);

        let scope = if self.global_context {
            context.clone()
        } else {
            context.child_scope()
        };

        // 参数值按调用方作用域替换
        for (name, value) in &self.parameters {
            let value = match value {
                Value::String(s) => Value::String(context.replace_dynamic_content(s)?),
                other => other.clone(),
            };
            debug!("绑定模板参数: {} = {}", name, value_to_string(&value));
            scope.set_variable(name, value)?;
        }

        self.core.execute_children(&scope)
    }

    fn as_container(&self) -> Option<&dyn ActionContainer> {
        Some(self)
    }
}

/// 模板容器构建器
pub struct TemplateBuilder {
    template_name: String,
    inline: bool,
    parameters: Vec<(String, Value)>,
    global_context: Option<bool>,
    default_global_context: bool,
    registry: Option<Arc<TemplateRegistry>>,
    actions: Vec<ActionRef>,
}

impl TemplateBuilder {
    /// 引用已注册的模板
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            template_name: name.into(),
            inline: false,
            parameters: Vec::new(),
            global_context: None,
            default_global_context: true,
            registry: None,
            actions: Vec::new(),
        }
    }

    /// 内联模板: 不查找注册表, 只执行作用域内声明的动作
    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::new(name)
        }
    }

    /// 模板参数 (调用方参数覆盖注册的默认参数)
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn global_context(mut self, global_context: bool) -> Self {
        self.global_context = Some(global_context);
        self
    }

    pub fn registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub(crate) fn defaults(
        mut self,
        registry: &Arc<TemplateRegistry>,
        global_context: bool,
    ) -> Self {
        self.registry.get_or_insert_with(|| Arc::clone(registry));
        self.default_global_context = global_context;
        self
    }
}

/// 合并参数, 同名时后者覆盖前者并保留首次出现的位置
fn merge_parameters(
    defaults: &[(String, Value)],
    overrides: Vec<(String, Value)>,
) -> Vec<(String, Value)> {
    let mut merged: Vec<(String, Value)> = defaults.to_vec();
    for (name, value) in overrides {
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => merged.push((name, value)),
        }
    }
    merged
}

impl ContainerBuilder for TemplateBuilder {
    fn build(self, actions: Vec<ActionRef>) -> Result<ActionRef> {
        let call_site_global = self.global_context.unwrap_or(self.default_global_context);

        let (mut children, parameters, global_context) = if self.inline {
            (Vec::new(), self.parameters, call_site_global)
        } else {
            let registry = self
                .registry
                .as_ref()
                .ok_or_else(|| ExecutorError::TemplateNotFound(self.template_name.clone()))?;
            let definition = registry.resolve(&self.template_name)?;
            (
                definition.actions.clone(),
                merge_parameters(&definition.parameters, self.parameters),
                definition.global_context && call_site_global,
            )
        };

        children.extend(self.actions);
        children.extend(actions);

        Ok(Arc::new(Template {
            core: ContainerCore::new(format!("template:{}", self.template_name), children),
            template_name: self.template_name,
            parameters,
            global_context,
        }))
    }
}
