//! Outcome record returned by every observe/wait call.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Reason attached to waits that ran out of time.
pub const TIMEOUT_REASON: &str = "timeout";

/// What a wait was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Text,
    Icon,
    Observe,
}

/// How a polling phase ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseOutcome {
    Success,
    Timeout,
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseOutcome::Success => write!(f, "success"),
            PhaseOutcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// Attempts made in one phase and how it ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase: &'static str,
    pub attempts: u32,
    #[serde(rename = "result")]
    pub outcome: PhaseOutcome,
    /// Score of the successful attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Target description plus the ordered per-phase breakdown.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(rename = "type")]
    pub target_type: TargetKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub phases: Vec<PhaseSummary>,
}

impl Diagnostics {
    pub fn new(target_type: TargetKind, target: impl Into<String>, threshold: Option<f64>) -> Self {
        Self {
            target_type,
            target: target.into(),
            threshold,
            phases: Vec::new(),
        }
    }

    /// Sum of attempts over all recorded phases.
    pub fn total_attempts(&self) -> u32 {
        self.phases.iter().map(|p| p.attempts).sum()
    }
}

/// Result of a single observe/wait call. Read-only once built.
///
/// `bool::from(&result)` is the same as `detected()`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisionResult {
    name: String,
    detected: bool,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    attempts: u32,
    #[serde(serialize_with = "serialize_secs")]
    elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    diagnostics: Diagnostics,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Payload carried by a probe: what the backend saw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    pub text: Option<String>,
    pub icon: Option<String>,
}

impl VisionResult {
    /// A successful detection. Never carries a reason.
    pub(crate) fn success(
        name: impl Into<String>,
        confidence: f64,
        observation: Observation,
        attempts: u32,
        elapsed: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            name: name.into(),
            detected: true,
            confidence: clamp_unit(confidence),
            text: observation.text,
            icon: observation.icon,
            attempts,
            elapsed,
            reason: None,
            diagnostics,
        }
    }

    /// A wait that exhausted its timeout.
    pub(crate) fn timeout(
        name: impl Into<String>,
        best_confidence: f64,
        observation: Observation,
        attempts: u32,
        elapsed: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            name: name.into(),
            detected: false,
            confidence: clamp_unit(best_confidence),
            text: observation.text,
            icon: observation.icon,
            attempts,
            elapsed,
            reason: Some(TIMEOUT_REASON.to_string()),
            diagnostics,
        }
    }

    /// A single-shot observation with no retry.
    pub(crate) fn observed(text: String, elapsed: Duration) -> Self {
        let detected = !text.is_empty();
        Self {
            name: "observe".to_string(),
            detected,
            confidence: if detected { 1.0 } else { 0.0 },
            text: Some(text),
            icon: None,
            attempts: 1,
            elapsed,
            reason: None,
            diagnostics: Diagnostics::new(TargetKind::Observe, "observe", None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Human-readable summary printed in verbose/diagnostic mode.
    pub fn report(&self) -> String {
        let mut out = String::from("[Vision Diagnostic]\n");
        out.push_str(&format!("Target      : {}\n", self.name));
        out.push_str(&format!("Detected    : {}\n", self.detected));
        out.push_str(&format!("Confidence  : {:.3}\n", self.confidence));
        out.push_str(&format!("Attempts    : {}\n", self.attempts));
        out.push_str(&format!("Elapsed     : {:.2}s\n", self.elapsed.as_secs_f64()));
        out.push_str(&format!("Reason      : {}\n", self.reason.as_deref().unwrap_or("-")));
        for phase in &self.diagnostics.phases {
            out.push_str(&format!(
                "  - Phase {}: {} attempts -> {}\n",
                phase.phase, phase.attempts, phase.outcome
            ));
        }
        out
    }
}

impl fmt::Display for VisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

impl From<&VisionResult> for bool {
    fn from(result: &VisionResult) -> bool {
        result.detected
    }
}

impl From<VisionResult> for bool {
    fn from(result: VisionResult) -> bool {
        result.detected
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostics_with(outcomes: &[(&'static str, u32, PhaseOutcome)]) -> Diagnostics {
        let mut d = Diagnostics::new(TargetKind::Text, "Dashboard", None);
        for (phase, attempts, outcome) in outcomes {
            d.phases.push(PhaseSummary {
                phase: *phase,
                attempts: *attempts,
                outcome: *outcome,
                confidence: None,
            });
        }
        d
    }

    #[test]
    fn test_detected_has_no_reason() {
        let d = diagnostics_with(&[("fast", 1, PhaseOutcome::Success)]);
        let r = VisionResult::success("Dashboard", 0.9, Observation::default(), 1, Duration::ZERO, d);
        assert!(r.detected());
        assert!(bool::from(&r));
        assert_eq!(r.reason(), None);
    }

    #[test]
    fn test_timed_out_sets_reason() {
        let d = diagnostics_with(&[("fast", 3, PhaseOutcome::Timeout)]);
        let r = VisionResult::timeout("x", 0.2, Observation::default(), 3, Duration::from_millis(500), d);
        assert!(!bool::from(r.clone()));
        assert_eq!(r.reason(), Some("timeout"));
        assert_eq!(r.diagnostics().total_attempts(), r.attempts());
    }

    #[test]
    fn test_confidence_clamped() {
        let d = Diagnostics::new(TargetKind::Icon, "i.png", Some(0.8));
        let r = VisionResult::timeout("i.png", f64::NAN, Observation::default(), 0, Duration::ZERO, d);
        assert_eq!(r.confidence(), 0.0);
    }

    #[test]
    fn test_observed_empty_text() {
        let r = VisionResult::observed(String::new(), Duration::ZERO);
        assert!(!r.detected());
        assert_eq!(r.confidence(), 0.0);
        assert_eq!(r.text(), Some(""));
        assert_eq!(r.diagnostics().target_type, TargetKind::Observe);
    }

    #[test]
    fn test_report_lists_phases() {
        let d = diagnostics_with(&[
            ("fast", 10, PhaseOutcome::Timeout),
            ("normal", 2, PhaseOutcome::Timeout),
        ]);
        let r = VisionResult::timeout("Login", 0.31, Observation::default(), 12, Duration::from_secs(3), d);
        let report = r.to_string();
        assert!(report.contains("Target      : Login"));
        assert!(report.contains("Confidence  : 0.310"));
        assert!(report.contains("Reason      : timeout"));
        assert!(report.contains("  - Phase fast: 10 attempts -> timeout"));
        assert!(report.contains("  - Phase normal: 2 attempts -> timeout"));
    }

    #[test]
    fn test_serializes_phase_result_key() {
        let d = diagnostics_with(&[("fast", 1, PhaseOutcome::Success)]);
        let r = VisionResult::success("a", 1.0, Observation::default(), 1, Duration::from_millis(250), d);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["diagnostics"]["phases"][0]["result"], "success");
        assert_eq!(json["diagnostics"]["type"], "text");
        assert_eq!(json["elapsed"], 0.25);
        assert!(json.get("reason").is_none());
    }
}
