//! 执行器配置管理
//!
//! 支持从多个源加载执行器配置:
//! - 环境变量 (优先级最高)
//! - 配置文件 (TOML/YAML/JSON)
//! - 默认值 (优先级最低)
//!
//! 配置文件搜索路径 (按优先级):
//! 1. `ATP_EXECUTOR_CONFIG` 环境变量指定的路径
//! 2. `./executor.toml` / `./executor.yaml` / `./executor.json` (当前目录)
//! 3. `~/.config/atp/executor.toml` (用户配置目录)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================
// 核心配置结构
// ============================================

/// 执行器配置 (顶层)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// 环境配置
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// 运行器配置
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// 环境配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// 日志级别 (trace/debug/info/warn/error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 运行器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// 测试开始前写入上下文的全局变量
    #[serde(default)]
    pub global_variables: BTreeMap<String, String>,

    /// 并行容器工作线程名前缀
    #[serde(default = "default_parallel_thread_prefix")]
    pub parallel_thread_prefix: String,

    /// repeat_on_error 重试间隔 (毫秒)
    #[serde(default = "default_repeat_on_error_sleep_ms")]
    pub repeat_on_error_sleep_ms: u64,

    /// 模板默认是否共享调用方上下文
    #[serde(default = "default_template_global_context")]
    pub template_global_context: bool,
}

// ============================================
// 默认值函数
// ============================================

fn default_log_level() -> String {
    "info".to_string()
}
fn default_parallel_thread_prefix() -> String {
    "atp-parallel".to_string()
}
fn default_repeat_on_error_sleep_ms() -> u64 {
    1000
}
fn default_template_global_context() -> bool {
    true
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================
// Default 实现
// ============================================

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            global_variables: BTreeMap::new(),
            parallel_thread_prefix: default_parallel_thread_prefix(),
            repeat_on_error_sleep_ms: default_repeat_on_error_sleep_ms(),
            template_global_context: default_template_global_context(),
        }
    }
}

// ============================================
// 配置加载实现
// ============================================

impl ExecutorConfig {
    /// 从多个源加载配置 (优先级: 环境变量 > 配置文件 > 默认值)
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::debug!("加载执行器配置: {:?}", path);
                Self::load_from_file(&path)?
            }
            None => {
                tracing::debug!("未找到执行器配置文件, 使用默认值");
                Self::default()
            }
        };

        config.apply_env_vars()?;
        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;

        let config = match extension(path) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("解析 TOML 配置失败: {:?}", path))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("解析 YAML 配置失败: {:?}", path))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("解析 JSON 配置失败: {:?}", path))?,
            _ => anyhow::bail!("不支持的配置文件格式: {:?}", path),
        };

        Ok(config)
    }

    /// 查找配置文件 (按优先级搜索)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("ATP_EXECUTOR_CONFIG") {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }

        let mut candidates = vec![
            PathBuf::from("./executor.toml"),
            PathBuf::from("./executor.yaml"),
            PathBuf::from("./executor.json"),
        ];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".config/atp/executor.toml"));
        }

        candidates.into_iter().find(|path| path.exists())
    }

    /// 从环境变量覆盖配置
    fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(level) = env::var("ATP_LOG_LEVEL") {
            self.environment.log_level = level;
        }
        if let Ok(prefix) = env::var("ATP_PARALLEL_THREAD_PREFIX") {
            self.runner.parallel_thread_prefix = prefix;
        }
        if let Ok(sleep) = env::var("ATP_REPEAT_ON_ERROR_SLEEP_MS") {
            self.runner.repeat_on_error_sleep_ms = sleep
                .parse()
                .context("无效的 ATP_REPEAT_ON_ERROR_SLEEP_MS 值")?;
        }
        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        let level = self.environment.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!("无效的日志级别: {}", self.environment.log_level);
        }

        if self.runner.parallel_thread_prefix.trim().is_empty() {
            anyhow::bail!("并行线程名前缀不能为空");
        }

        if let Some(name) = self.runner.global_variables.keys().find(|k| k.trim().is_empty()) {
            anyhow::bail!("全局变量名不能为空: {:?}", name);
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建目录失败: {:?}", parent))?;
        }

        let content = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).context("序列化 TOML 失败")?,
            Some("yaml") | Some("yml") => {
                serde_yaml::to_string(self).context("序列化 YAML 失败")?
            }
            Some("json") => serde_json::to_string_pretty(self).context("序列化 JSON 失败")?,
            _ => anyhow::bail!("不支持的配置文件格式: {:?}", path),
        };

        fs::write(path, content).with_context(|| format!("写入配置文件失败: {:?}", path))?;

        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}
