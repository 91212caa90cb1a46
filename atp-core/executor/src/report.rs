//! 执行报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionRecord, ActionRef, ActionStatus};

/// 执行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// 测试名称
    pub test_name: String,

    /// 测试描述
    pub description: Option<String>,

    /// 是否通过
    pub passed: bool,

    /// 失败原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// 开始时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// 执行的顶层步骤数
    pub steps_executed: usize,

    /// 通过的顶层步骤数
    pub passed_count: usize,

    /// 失败的顶层步骤数
    pub failed_count: usize,

    /// 总耗时（毫秒）
    pub duration_ms: u64,

    /// 步骤报告列表
    pub steps: Vec<StepReport>,
}

impl ExecutionReport {
    pub fn new(name: &str) -> Self {
        Self {
            test_name: name.to_string(),
            description: None,
            passed: true,
            error: None,
            started_at: None,
            steps_executed: 0,
            passed_count: 0,
            failed_count: 0,
            duration_ms: 0,
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, step: StepReport) {
        self.steps_executed += 1;

        match step.status {
            ActionStatus::Success => self.passed_count += 1,
            ActionStatus::Failed => {
                self.failed_count += 1;
                self.passed = false;
            }
            ActionStatus::Skipped => {}
        }

        self.steps.push(step);
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 导出为 YAML
    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        serde_yaml::to_string(self)
    }
}

/// 步骤报告 (容器的子动作嵌套在 `children` 中)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// 声明顺序中的位置
    pub step_index: usize,

    /// 动作名称
    pub name: String,

    /// 步骤状态
    pub status: ActionStatus,

    /// 错误信息
    pub error: Option<String>,

    /// 执行次数
    pub executions: usize,

    /// 耗时（毫秒）
    pub duration_ms: u64,

    /// 子步骤
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepReport>,
}

impl StepReport {
    /// 由执行记录和对应动作生成报告, 递归展开容器
    pub fn from_record(record: &ActionRecord, action: Option<&ActionRef>) -> Self {
        let children = action
            .and_then(|action| action.as_container())
            .map(|container| {
                let actions = container.actions();
                container
                    .executed_actions()
                    .iter()
                    .map(|child| Self::from_record(child, actions.get(child.index)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            step_index: record.index,
            name: record.name.clone(),
            status: record.status,
            error: record.error.as_ref().map(ToString::to_string),
            executions: record.executions,
            duration_ms: record.duration.as_millis() as u64,
            children,
        }
    }
}
