use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::{Result, TestAction, TestContext};

/// 阻塞等待
#[derive(Debug, Clone)]
pub struct SleepAction {
    duration: Duration,
}

impl SleepAction {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl TestAction for SleepAction {
    fn name(&self) -> &str {
        "sleep"
    }

    fn execute(&self, _context: &TestContext) -> Result<()> {
        debug!("等待 {:?}", self.duration);
        thread::sleep(self.duration);
        Ok(())
    }
}

/// 计时动作
///
/// 第一次执行启动计时器, 之后每次执行把自启动以来的毫秒数写入 `<id><suffix>` 变量。
#[derive(Debug, Clone)]
pub struct StopTimeAction {
    id: String,
    suffix: String,
}

impl StopTimeAction {
    pub const DEFAULT_ID: &'static str = "atp.stop.time";
    pub const DEFAULT_SUFFIX: &'static str = "_ms";

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            suffix: Self::DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// 耗时变量名
    pub fn variable_name(&self) -> String {
        format!("{}{}", self.id, self.suffix)
    }
}

impl Default for StopTimeAction {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ID)
    }
}

impl TestAction for StopTimeAction {
    fn name(&self) -> &str {
        "stop-time"
    }

    fn execute(&self, context: &TestContext) -> Result<()> {
        let id = context.replace_dynamic_content(&self.id)?;
        match context.timers().start_or_elapsed(&id) {
            None => info!("启动计时器: {}", id),
            Some(elapsed) => {
                let ms = elapsed.as_millis() as u64;
                info!("计时器 {} 已运行 {} ms", id, ms);
                context.set_variable(&format!("{}{}", id, self.suffix), ms)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_time_sets_elapsed() {
        let context = TestContext::new();
        let action = StopTimeAction::new("timer");

        action.execute(&context).unwrap();
        assert!(!context.contains_variable("timer_ms"));

        thread::sleep(Duration::from_millis(5));
        action.execute(&context).unwrap();

        let elapsed = context.get_variable("timer_ms").unwrap();
        assert!(elapsed.as_u64().unwrap() >= 5);
    }

    #[test]
    fn test_stop_time_custom_suffix() {
        let context = TestContext::new();
        let action = StopTimeAction::default().with_suffix(".elapsed");
        assert_eq!(action.variable_name(), "atp.stop.time.elapsed");

        action.execute(&context).unwrap();
        action.execute(&context).unwrap();
        assert!(context.contains_variable("atp.stop.time.elapsed"));
    }

    #[test]
    fn test_sleep() {
        let action = SleepAction::millis(1);
        assert_eq!(action.duration(), Duration::from_millis(1));
        assert!(action.execute(&TestContext::new()).is_ok());
    }
}
