//! Phased polling: fast → normal → slow.
//!
//! Fast polling catches targets that show up almost immediately; later
//! phases poll less often so long waits do not burn OCR/matching calls.
//!
//! Per wait the scheduler is a small state machine. Each phase polls until
//! one of three exits: the probe succeeds (terminal), the phase's own cap
//! runs out (move to the next phase), or the overall timeout runs out
//! (terminal). Every phase that was entered leaves exactly one entry in the
//! diagnostics, including the one interrupted by the overall timeout.

use anyhow::Result;
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::state::{Diagnostics, Observation, PhaseOutcome, PhaseSummary, TargetKind, VisionResult};

/// One stage of the polling policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    /// Sleep between attempts
    pub interval: Duration,
    /// Time budget of the phase; `None` runs until the overall timeout
    pub limit: Option<Duration>,
}

/// The fixed phase sequence.
pub const PHASES: [Phase; 3] = [
    Phase {
        name: "fast",
        interval: Duration::from_millis(200),
        limit: Some(Duration::from_secs(2)),
    },
    Phase {
        name: "normal",
        interval: Duration::from_millis(500),
        limit: Some(Duration::from_secs(5)),
    },
    Phase {
        name: "slow",
        interval: Duration::from_secs(1),
        limit: None,
    },
];

/// Outcome of one capture-and-score cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Probe {
    pub succeeded: bool,
    pub confidence: f64,
    pub observation: Observation,
}

impl Probe {
    pub fn new(succeeded: bool, confidence: f64, observation: Observation) -> Self {
        Self {
            succeeded,
            confidence,
            observation,
        }
    }

    /// A failed attempt that measured nothing.
    pub fn miss(observation: Observation) -> Self {
        Self::new(false, 0.0, observation)
    }
}

/// What a wait is looking for, echoed into the result.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    pub value: String,
    pub threshold: Option<f64>,
}

impl Target {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Text,
            value: value.into(),
            threshold: None,
        }
    }

    pub fn icon(path: impl Into<String>, threshold: f64) -> Self {
        Self {
            kind: TargetKind::Icon,
            value: path.into(),
            threshold: Some(threshold),
        }
    }

    /// Payload reported when no attempt produced one.
    fn empty_observation(&self) -> Observation {
        match self.kind {
            TargetKind::Icon => Observation {
                text: None,
                icon: Some(self.value.clone()),
            },
            _ => Observation::default(),
        }
    }
}

/// Why a phase stopped polling.
#[derive(Debug)]
enum PhaseExit {
    Succeeded(Probe),
    PhaseTimedOut,
    OverallTimedOut,
}

/// Runs a probe under the phased policy until success or timeout.
#[derive(Clone, Debug)]
pub struct PhaseScheduler {
    phases: Vec<Phase>,
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new(PHASES.to_vec())
    }
}

impl PhaseScheduler {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Polls `detect` until it succeeds or `timeout` has elapsed.
    ///
    /// Errors from `detect` abort the wait; callers turn transient failures
    /// into failed probes before they get here.
    pub fn run<F>(
        &self,
        clock: &dyn Clock,
        timeout: Duration,
        target: Target,
        mut detect: F,
    ) -> Result<VisionResult>
    where
        F: FnMut() -> Result<Probe>,
    {
        let started = clock.now();
        let elapsed = |now: Instant| now.saturating_duration_since(started);

        let mut diagnostics = Diagnostics::new(target.kind, target.value.clone(), target.threshold);
        let mut attempts: u32 = 0;
        let mut best: Option<Probe> = None;

        for phase in &self.phases {
            let phase_started = clock.now();
            let mut phase_attempts: u32 = 0;

            let exit = loop {
                let now = clock.now();
                if elapsed(now) >= timeout {
                    break PhaseExit::OverallTimedOut;
                }
                if let Some(limit) = phase.limit {
                    if now.saturating_duration_since(phase_started) >= limit {
                        break PhaseExit::PhaseTimedOut;
                    }
                }

                let probe = detect()?;
                attempts += 1;
                phase_attempts += 1;

                if probe.succeeded {
                    break PhaseExit::Succeeded(probe);
                }
                if best.as_ref().is_none_or(|b| probe.confidence > b.confidence) {
                    best = Some(probe);
                }

                // Never sleep past the overall deadline
                let remaining = timeout.saturating_sub(elapsed(clock.now()));
                clock.sleep(phase.interval.min(remaining));
            };

            match exit {
                PhaseExit::Succeeded(probe) => {
                    diagnostics.phases.push(PhaseSummary {
                        phase: phase.name,
                        attempts: phase_attempts,
                        outcome: PhaseOutcome::Success,
                        confidence: Some(probe.confidence),
                    });
                    crate::log(&format!(
                        "Detected '{}' in phase {} after {} attempt(s) (confidence {:.3})",
                        target.value, phase.name, attempts, probe.confidence
                    ));
                    return Ok(VisionResult::success(
                        target.value,
                        probe.confidence,
                        probe.observation,
                        attempts,
                        elapsed(clock.now()),
                        diagnostics,
                    ));
                }
                PhaseExit::PhaseTimedOut | PhaseExit::OverallTimedOut => {
                    diagnostics.phases.push(PhaseSummary {
                        phase: phase.name,
                        attempts: phase_attempts,
                        outcome: PhaseOutcome::Timeout,
                        confidence: None,
                    });
                    if matches!(exit, PhaseExit::OverallTimedOut) {
                        break;
                    }
                }
            }
        }

        let (best_confidence, observation) = match best {
            Some(probe) => (probe.confidence, probe.observation),
            None => (0.0, target.empty_observation()),
        };
        crate::log(&format!(
            "Timed out waiting for '{}' after {} attempt(s) (best confidence {:.3})",
            target.value, attempts, best_confidence
        ));
        Ok(VisionResult::timeout(
            target.value,
            best_confidence,
            observation,
            attempts,
            elapsed(clock.now()),
            diagnostics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Virtual clock: sleeping advances time instantly.
    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, d: Duration) {
            *self.offset.lock().unwrap() += d;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }

    fn phase_names(result: &VisionResult) -> Vec<(&'static str, PhaseOutcome)> {
        result
            .diagnostics()
            .phases
            .iter()
            .map(|p| (p.phase, p.outcome))
            .collect()
    }

    #[test]
    fn test_first_attempt_success_stays_in_fast_phase() {
        let clock = ManualClock::new();
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_secs(1), Target::text("Dashboard"), || {
                Ok(Probe::new(true, 0.9, Observation::default()))
            })
            .unwrap();

        assert!(result.detected());
        assert_eq!(result.attempts(), 1);
        assert_eq!(result.reason(), None);
        assert_eq!(phase_names(&result), vec![("fast", PhaseOutcome::Success)]);
        assert_eq!(result.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_timeout_inside_fast_phase_records_partial_phase() {
        let clock = ManualClock::new();
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_millis(500), Target::text("x"), || {
                Ok(Probe::new(false, 0.2, Observation::default()))
            })
            .unwrap();

        assert!(!result.detected());
        assert_eq!(result.reason(), Some("timeout"));
        // Attempts at 0.0, 0.2, 0.4; the third sleep is cut to the deadline
        assert_eq!(result.attempts(), 3);
        assert_eq!(phase_names(&result), vec![("fast", PhaseOutcome::Timeout)]);
        assert_eq!(result.diagnostics().total_attempts(), result.attempts());
        assert_eq!(result.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn test_phases_progress_in_order() {
        let clock = ManualClock::new();
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_secs(10), Target::text("x"), || {
                Ok(Probe::new(false, 0.0, Observation::default()))
            })
            .unwrap();

        let phases = &result.diagnostics().phases;
        assert_eq!(
            phases.iter().map(|p| p.phase).collect::<Vec<_>>(),
            vec!["fast", "normal", "slow"]
        );
        // fast: 0.0..2.0 every 0.2s, normal: 2.0..7.0 every 0.5s, slow: 7.0..10.0 every 1s
        assert_eq!(phases[0].attempts, 10);
        assert_eq!(phases[1].attempts, 10);
        assert_eq!(phases[2].attempts, 3);
        assert_eq!(result.attempts(), 23);
        assert!(phases.iter().all(|p| p.outcome == PhaseOutcome::Timeout));
    }

    #[test]
    fn test_success_in_normal_phase() {
        let clock = ManualClock::new();
        let mut calls = 0;
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_secs(10), Target::text("x"), || {
                calls += 1;
                Ok(Probe::new(calls == 12, 0.7, Observation::default()))
            })
            .unwrap();

        assert!(result.detected());
        assert_eq!(result.attempts(), 12);
        assert_eq!(
            phase_names(&result),
            vec![("fast", PhaseOutcome::Timeout), ("normal", PhaseOutcome::Success)]
        );
        assert_eq!(result.diagnostics().phases[1].attempts, 2);
    }

    #[test]
    fn test_timeout_reports_best_confidence() {
        let clock = ManualClock::new();
        let scores = [0.1, 0.55, 0.3];
        let mut i = 0;
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_millis(500), Target::icon("i.png", 0.8), || {
                let score = scores[i % scores.len()];
                i += 1;
                Ok(Probe::new(false, score, Observation::default()))
            })
            .unwrap();

        assert!(!result.detected());
        assert_eq!(result.confidence(), 0.55);
        assert_eq!(result.diagnostics().threshold, Some(0.8));
    }

    #[test]
    fn test_probe_error_aborts() {
        let clock = ManualClock::new();
        let err = PhaseScheduler::default()
            .run(&clock, Duration::from_secs(1), Target::text("x"), || {
                Err(anyhow!("monitor gone"))
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "monitor gone");
    }

    #[test]
    fn test_sleep_never_exceeds_phase_interval() {
        struct RecordingClock {
            inner: ManualClock,
            sleeps: Mutex<Vec<Duration>>,
        }
        impl Clock for RecordingClock {
            fn now(&self) -> Instant {
                self.inner.now()
            }
            fn sleep(&self, duration: Duration) {
                self.sleeps.lock().unwrap().push(duration);
                self.inner.sleep(duration);
            }
        }

        let clock = RecordingClock {
            inner: ManualClock::new(),
            sleeps: Mutex::new(Vec::new()),
        };
        PhaseScheduler::default()
            .run(&clock, Duration::from_millis(300), Target::text("x"), || {
                Ok(Probe::miss(Observation::default()))
            })
            .unwrap();

        let sleeps = clock.sleeps.lock().unwrap();
        assert_eq!(*sleeps, vec![Duration::from_millis(200), Duration::from_millis(100)]);
    }

    #[test]
    fn test_slow_probe_eats_the_phase_budget() {
        // Each attempt takes 1.5s of wall time: fast gets 2 attempts, normal 4
        let clock = ManualClock::new();
        let result = PhaseScheduler::default()
            .run(&clock, Duration::from_secs(9), Target::text("x"), || {
                clock.advance(Duration::from_millis(1500));
                Ok(Probe::miss(Observation::default()))
            })
            .unwrap();

        let attempts: Vec<u32> = result.diagnostics().phases.iter().map(|p| p.attempts).collect();
        assert_eq!(result.diagnostics().total_attempts(), result.attempts());
        assert_eq!(attempts[0], 2);
        assert!(!result.detected());
    }
}
