//! Time source and the smart sleep used between polling attempts.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::System;

/// Shortest fraction of the requested interval a smart sleep will use.
const MIN_SLEEP_FACTOR: f64 = 0.5;

/// Time source for the polling loop.
///
/// `sleep` may return early but must never block longer than asked.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Sleep that shortens the interval on an idle machine.
///
/// CPU usage is sampled on every call; sysinfo needs two samples to report
/// usage, so the first call after construction sleeps the full interval.
pub struct SmartSleep {
    system: Mutex<System>,
}

impl SmartSleep {
    pub fn new() -> Self {
        let mut system = System::new();
        // Baseline for the next delta
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }

    /// Average CPU usage across cores in percent, or 100 when unknown.
    fn cpu_usage(&self) -> f32 {
        let Ok(mut system) = self.system.lock() else {
            return 100.0;
        };
        system.refresh_cpu_usage();
        let cpus = system.cpus();
        if cpus.is_empty() {
            return 100.0;
        }
        cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
    }

    /// The interval actually slept for `requested`.
    pub fn adjusted(&self, requested: Duration) -> Duration {
        requested.mul_f64(sleep_factor(self.cpu_usage()))
    }

    pub fn sleep(&self, requested: Duration) {
        std::thread::sleep(self.adjusted(requested));
    }
}

impl Default for SmartSleep {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps CPU usage (percent) to a factor in `MIN_SLEEP_FACTOR..=1.0`.
/// A busy machine gets the full interval.
pub fn sleep_factor(cpu_usage: f32) -> f64 {
    if !cpu_usage.is_finite() {
        return 1.0;
    }
    let load = (cpu_usage as f64 / 100.0).clamp(0.0, 1.0);
    MIN_SLEEP_FACTOR + (1.0 - MIN_SLEEP_FACTOR) * load
}

/// Wall clock with smart sleeping.
#[derive(Default)]
pub struct SystemClock {
    sleeper: SmartSleep,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}
