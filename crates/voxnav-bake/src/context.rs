//! Per-bake phase timing and message capture
//!
//! Messages are forwarded to the `log` facade and the most recent ones are
//! kept on the context so a host can inspect what its last bake reported.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;
use web_time::Instant;

/// Messages kept on one context before the oldest are dropped
pub const MAX_BAKE_MESSAGES: usize = 64;

/// Phases timed during a bake or a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerCategory {
    /// Whole bake, from input validation to the finished graph
    Total,
    /// Recursive quadrant subdivision
    Subdivide,
    /// Voxel merging
    Simplify,
    /// Neighbor and portal construction
    Neighbors,
    /// Packing a graph for storage
    Serialize,
    /// Rebuilding a graph from packed data
    Deserialize,
}

/// One message reported while baking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakeMessage {
    pub level: log::Level,
    pub text: String,
}

/// Accumulated timing of one phase
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTiming {
    pub total: Duration,
    pub runs: usize,
}

#[derive(Debug, Default)]
pub struct BakeContext {
    messages: Vec<BakeMessage>,
    running: HashMap<TimerCategory, Instant>,
    phases: HashMap<TimerCategory, PhaseTiming>,
}

impl BakeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_debug(&mut self, text: impl Into<String>) {
        self.record(log::Level::Debug, text.into());
    }

    pub fn log_info(&mut self, text: impl Into<String>) {
        self.record(log::Level::Info, text.into());
    }

    fn record(&mut self, level: log::Level, text: String) {
        log::log!(level, "{}", text);
        if self.messages.len() == MAX_BAKE_MESSAGES {
            self.messages.remove(0);
        }
        self.messages.push(BakeMessage { level, text });
    }

    pub fn start_timer(&mut self, category: TimerCategory) {
        self.running.insert(category, Instant::now());
    }

    /// Stops a running timer and returns the length of this run
    pub fn stop_timer(&mut self, category: TimerCategory) -> Option<Duration> {
        let elapsed = self.running.remove(&category)?.elapsed();
        let phase = self.phases.entry(category).or_default();
        phase.total += elapsed;
        phase.runs += 1;
        Some(elapsed)
    }

    pub fn phase(&self, category: TimerCategory) -> PhaseTiming {
        self.phases.get(&category).copied().unwrap_or_default()
    }

    pub fn messages(&self) -> &[BakeMessage] {
        &self.messages
    }

    /// One line per timed phase, slowest first
    pub fn timer_summary(&self) -> String {
        let mut phases: Vec<_> = self.phases.iter().collect();
        phases.sort_by(|a, b| b.1.total.cmp(&a.1.total));

        let mut out = String::new();
        for (category, phase) in phases {
            let ms = phase.total.as_secs_f64() * 1000.0;
            let _ = writeln!(out, "{:<12} {:8.2}ms x{}", format!("{:?}", category), ms, phase.runs);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_phase_runs_accumulate() {
        let mut context = BakeContext::new();
        for _ in 0..3 {
            context.start_timer(TimerCategory::Simplify);
            thread::sleep(Duration::from_millis(2));
            context.stop_timer(TimerCategory::Simplify);
        }

        let phase = context.phase(TimerCategory::Simplify);
        assert_eq!(phase.runs, 3);
        assert!(phase.total >= Duration::from_millis(6));
        assert!(context.timer_summary().starts_with("Simplify"));
    }

    #[test]
    fn test_stopping_idle_timer_is_noop() {
        let mut context = BakeContext::new();
        assert!(context.stop_timer(TimerCategory::Total).is_none());
        assert_eq!(context.phase(TimerCategory::Total).runs, 0);
        assert!(context.timer_summary().is_empty());
    }

    #[test]
    fn test_messages_keep_the_most_recent() {
        let mut context = BakeContext::new();
        context.log_debug("first");
        for i in 0..MAX_BAKE_MESSAGES {
            context.log_info(format!("voxels {}", i));
        }
        let messages = context.messages();
        assert_eq!(messages.len(), MAX_BAKE_MESSAGES);
        assert_eq!(messages[0].text, "voxels 0");
        assert_eq!(messages[0].level, log::Level::Info);
    }
}
