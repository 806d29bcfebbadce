use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::StepTimings;

/// 时间跟踪作用域，整个请求一个实例
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<&'static str, Instant>,
    phase_durations: HashMap<&'static str, Duration>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: HashMap::new(),
        }
    }

    /// 开始一个阶段的计时
    pub fn start_phase(&mut self, phase: &'static str) {
        self.phase_start_times.insert(phase, Instant::now());
    }

    /// 结束一个阶段的计时，同名阶段的耗时会覆盖上一轮
    pub fn end_phase(&mut self, phase: &'static str) -> Option<Duration> {
        let start = self.phase_start_times.remove(phase)?;
        let duration = start.elapsed();
        self.phase_durations.insert(phase, duration);
        Some(duration)
    }

    fn phase_ms(&self, phase: &'static str) -> u64 {
        self.phase_durations
            .get(phase)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// 取出本轮三个阶段的耗时并清空
    pub fn take_step_timings(&mut self) -> StepTimings {
        let timings = StepTimings {
            retrieve_ms: self.phase_ms(TimingKeys::RETRIEVE),
            generate_ms: self.phase_ms(TimingKeys::GENERATE),
            critique_ms: self.phase_ms(TimingKeys::CRITIQUE),
        };
        self.phase_durations.clear();
        timings
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// 阶段名
pub struct TimingKeys;

impl TimingKeys {
    pub const RETRIEVE: &'static str = "retrieve";
    pub const GENERATE: &'static str = "generate";
    pub const CRITIQUE: &'static str = "critique";
}
