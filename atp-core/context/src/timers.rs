//! 计时器 / 计数器注册表

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// 命名计时器和计数器
///
/// 计时器记录首次启动的时间点, 计数器为单调递增的整数。
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<String, Instant>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动计时器, 已存在时保持原起点并返回 `false`
    pub fn start(&self, id: &str) -> bool {
        let mut timers = self.timers.lock();
        if timers.contains_key(id) {
            return false;
        }
        timers.insert(id.to_string(), Instant::now());
        true
    }

    /// 首次调用启动计时器并返回 `None`, 之后返回自启动以来的耗时
    pub fn start_or_elapsed(&self, id: &str) -> Option<Duration> {
        let mut timers = self.timers.lock();
        match timers.get(id) {
            Some(started) => Some(started.elapsed()),
            None => {
                timers.insert(id.to_string(), Instant::now());
                None
            }
        }
    }

    /// 查询耗时
    pub fn elapsed(&self, id: &str) -> Option<Duration> {
        self.timers.lock().get(id).map(Instant::elapsed)
    }

    /// 停止并移除计时器, 返回最终耗时
    pub fn stop(&self, id: &str) -> Option<Duration> {
        self.timers.lock().remove(id).map(|started| started.elapsed())
    }

    /// 计数器加一并返回新值
    pub fn increment(&self, name: &str) -> u64 {
        let mut counters = self.counters.lock();
        let counter = counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// 当前计数 (未使用过的计数器为 0)
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// 重置计数器
    pub fn reset_counter(&self, name: &str) {
        self.counters.lock().remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_start_or_elapsed() {
        let registry = TimerRegistry::new();
        assert!(registry.start_or_elapsed("t").is_none());
        thread::sleep(Duration::from_millis(5));
        let elapsed = registry.start_or_elapsed("t").unwrap();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_start_keeps_origin() {
        let registry = TimerRegistry::new();
        assert!(registry.start("t"));
        assert!(!registry.start("t"));
        assert!(registry.elapsed("t").is_some());
        assert!(registry.stop("t").is_some());
        assert!(registry.elapsed("t").is_none());
    }

    #[test]
    fn test_counters() {
        let registry = TimerRegistry::new();
        assert_eq!(registry.counter("c"), 0);
        assert_eq!(registry.increment("c"), 1);
        assert_eq!(registry.increment("c"), 2);
        registry.reset_counter("c");
        assert_eq!(registry.counter("c"), 0);
    }
}
