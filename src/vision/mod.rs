//! The visual wait engine.
//!
//! `VisionMode` ties the pieces together: a capture backend, an OCR engine,
//! a template matcher and a clock, driven by the phased scheduler. Each
//! wait is synchronous and runs on the calling thread.

pub mod clock;
pub mod confidence;
pub mod matcher;
pub mod phases;
pub mod scale;
pub mod state;

pub use clock::{Clock, SmartSleep, SystemClock};
pub use confidence::{text_confidence, DEFAULT_ICON_THRESHOLD, TEXT_THRESHOLD};
pub use matcher::{NccMatcher, TemplateMatcher};
pub use phases::{Phase, PhaseScheduler, Probe, Target, PHASES};
pub use scale::ScaleDetector;
pub use state::{Diagnostics, Observation, PhaseOutcome, PhaseSummary, TargetKind, VisionResult};

use image::DynamicImage;
use std::path::Path;
use std::time::Duration;

use crate::capture::{self, CaptureBackend};
use crate::config::VisionConfig;
use crate::error::{Result, VisionError};
use crate::ocr::{TesseractOcr, TextRecognizer};
use crate::patterns::PatternStore;
use confidence::{icon_matches, text_matches};

/// Visual waits over one monitor.
pub struct VisionMode {
    config: VisionConfig,
    capture: Box<dyn CaptureBackend>,
    ocr: Box<dyn TextRecognizer>,
    matcher: Box<dyn TemplateMatcher>,
    clock: Box<dyn Clock>,
    scheduler: PhaseScheduler,
    scale: ScaleDetector,
    patterns: PatternStore,
}

impl VisionMode {
    /// Builds a `VisionMode` with the real backends: the default capture
    /// backend, Tesseract OCR and normalized cross-correlation.
    pub fn new(config: VisionConfig) -> Result<Self> {
        let ocr = TesseractOcr::new(config.tesseract_lang.clone());
        Self::with_backends(
            config,
            capture::default_backend(),
            Box::new(ocr),
            Box::new(NccMatcher),
        )
    }

    /// Builds a `VisionMode` around explicit backends.
    ///
    /// Fails when the pattern file exists but cannot be read, so that a
    /// later `learn` never overwrites it.
    pub fn with_backends(
        config: VisionConfig,
        capture: Box<dyn CaptureBackend>,
        ocr: Box<dyn TextRecognizer>,
        matcher: Box<dyn TemplateMatcher>,
    ) -> Result<Self> {
        crate::set_file_logging(config.log_to_file);
        let patterns = PatternStore::open(config.patterns_path()).map_err(VisionError::Patterns)?;
        crate::log(&format!(
            "VisionMode ready (capture: {}, screen {}, {} pattern(s))",
            capture.name(),
            config.screen_index,
            patterns.len()
        ));

        Ok(Self {
            scale: ScaleDetector::new(config.screen_index),
            config,
            capture,
            ocr,
            matcher,
            clock: Box::new(SystemClock::new()),
            scheduler: PhaseScheduler::default(),
            patterns,
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the pattern store.
    pub fn with_patterns(mut self, patterns: PatternStore) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternStore {
        &self.patterns
    }

    /// Physical pixels per logical pixel of the configured monitor.
    /// Measured on first use; 1.0 when it cannot be measured.
    pub fn screen_scale(&self) -> f64 {
        self.scale.scale(self.capture.as_ref())
    }

    /// Captures one frame and returns whatever text OCR reads from it.
    pub fn observe(&self) -> Result<VisionResult> {
        self.check_region()?;
        let started = self.clock.now();
        let frame = capture::capture_frame(
            self.capture.as_ref(),
            self.config.screen_index,
            false,
            self.config.region.as_ref(),
        )
        .map_err(VisionError::Capture)?;
        let text = self.ocr.extract_text(&frame).trim().to_string();
        let elapsed = self.clock.now().saturating_duration_since(started);

        crate::log(&format!("Observed {} character(s) of text", text.chars().count()));
        Ok(VisionResult::observed(text, elapsed))
    }

    /// Polls until `text` shows up on screen or `timeout` runs out.
    pub fn wait_text(&self, text: &str, timeout: Duration) -> Result<VisionResult> {
        check_timeout(timeout)?;
        self.check_region()?;
        crate::log(&format!("Waiting for text '{}' (timeout {:?})", text, timeout));

        let result = self
            .scheduler
            .run(self.clock.as_ref(), timeout, Target::text(text), || {
                let Some(frame) = self.grab(false)? else {
                    return Ok(Probe::miss(Observation::default()));
                };
                let observed = self.ocr.extract_text(&frame).trim().to_string();
                let confidence = text_confidence(Some(&observed), text);
                Ok(Probe::new(
                    text_matches(confidence),
                    confidence,
                    Observation {
                        text: Some(observed),
                        icon: None,
                    },
                ))
            })
            .map_err(VisionError::Capture)?;

        self.report_timeout(&result);
        Ok(result)
    }

    /// Polls until the icon at `icon_path` shows up on screen with a match
    /// score of at least `threshold`, or `timeout` runs out.
    ///
    /// The icon is loaded and scaled once, before the first attempt.
    pub fn wait_icon(
        &self,
        icon_path: impl AsRef<Path>,
        timeout: Duration,
        threshold: f64,
    ) -> Result<VisionResult> {
        let icon_path = icon_path.as_ref();
        check_timeout(timeout)?;
        self.check_region()?;
        if !icon_path.is_file() {
            return Err(VisionError::IconNotFound(icon_path.to_path_buf()));
        }

        let template = scale::load_icon(icon_path, self.screen_scale())?;
        let icon_name = icon_path.display().to_string();
        crate::log(&format!(
            "Waiting for icon '{}' ({}x{}, threshold {:.2}, timeout {:?})",
            icon_name,
            template.width(),
            template.height(),
            threshold,
            timeout
        ));

        let observation = Observation {
            text: None,
            icon: Some(icon_name.clone()),
        };
        let result = self
            .scheduler
            .run(
                self.clock.as_ref(),
                timeout,
                Target::icon(icon_name.as_str(), threshold),
                || {
                    let Some(frame) = self.grab(true)? else {
                        return Ok(Probe::miss(observation.clone()));
                    };
                    let score = self.matcher.match_template(&frame.into_luma8(), &template);
                    Ok(Probe::new(icon_matches(score, threshold), score, observation.clone()))
                },
            )
            .map_err(VisionError::Capture)?;

        self.report_timeout(&result);
        Ok(result)
    }

    /// Stores a named text pattern.
    pub fn learn(&mut self, name: &str, text: &str) -> Result<()> {
        self.patterns.learn(name, text).map_err(VisionError::Patterns)
    }

    /// Stores a named icon pattern.
    pub fn learn_icon(&mut self, name: &str, icon_path: &str) -> Result<()> {
        self.patterns
            .learn_icon(name, icon_path)
            .map_err(VisionError::Patterns)
    }

    /// One capture for the polling loop. Transient failures become `None`
    /// so the attempt counts as a miss; structural ones abort the wait.
    fn grab(&self, grayscale: bool) -> anyhow::Result<Option<DynamicImage>> {
        match capture::capture_frame(
            self.capture.as_ref(),
            self.config.screen_index,
            grayscale,
            self.config.region.as_ref(),
        ) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if capture::is_structural(&e) => Err(e),
            Err(e) => {
                crate::log(&format!("Capture failed, retrying: {:#}", e));
                Ok(None)
            }
        }
    }

    fn check_region(&self) -> Result<()> {
        match self.config.region {
            Some(region) if !region.is_valid() => Err(VisionError::InvalidRegion(region)),
            _ => Ok(()),
        }
    }

    fn report_timeout(&self, result: &VisionResult) {
        if !result.detected() && self.config.reports_diagnostics() {
            eprint!("{}", result.report());
        }
    }
}

fn check_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(VisionError::InvalidTimeout);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::config::RelativeRect;
    use anyhow::anyhow;
    use image::{GrayImage, Luma, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tempfile::{tempdir, TempDir};

    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
        }
    }

    /// Fails the first `flaky` captures, then returns a blank frame.
    struct FlakyCapture {
        flaky: usize,
        calls: Arc<AtomicUsize>,
    }

    impl CaptureBackend for FlakyCapture {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn monitor_count(&self) -> anyhow::Result<usize> {
            Ok(1)
        }

        fn capture(&self, monitor: usize) -> anyhow::Result<RgbaImage> {
            if monitor > 0 {
                return Err(CaptureError::MonitorOutOfRange { index: monitor, count: 1 }.into());
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.flaky {
                return Err(anyhow!("display busy"));
            }
            Ok(RgbaImage::new(64, 48))
        }

        fn logical_size(&self, _monitor: usize) -> anyhow::Result<(u32, u32)> {
            Ok((64, 48))
        }
    }

    struct FixedOcr(&'static str);

    impl TextRecognizer for FixedOcr {
        fn extract_text(&self, _frame: &DynamicImage) -> String {
            self.0.to_string()
        }
    }

    struct FixedScore(f64);

    impl TemplateMatcher for FixedScore {
        fn match_template(&self, _frame: &GrayImage, _template: &GrayImage) -> f64 {
            self.0
        }
    }

    struct Harness {
        vision: VisionMode,
        calls: Arc<AtomicUsize>,
        dir: TempDir,
    }

    fn harness(config: VisionConfig, flaky: usize, text: &'static str, score: f64) -> Harness {
        let dir = tempdir().unwrap();
        let config = VisionConfig {
            patterns_file: Some(dir.path().join("patterns.json")),
            ..config
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let vision = VisionMode::with_backends(
            config,
            Box::new(FlakyCapture { flaky, calls: calls.clone() }),
            Box::new(FixedOcr(text)),
            Box::new(FixedScore(score)),
        )
        .unwrap()
        .with_clock(Box::new(ManualClock {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }));
        Harness { vision, calls, dir }
    }

    #[test]
    fn test_transient_capture_errors_are_retried() {
        let h = harness(VisionConfig::default(), 2, "Dashboard", 0.0);
        let result = h.vision.wait_text("Dashboard", Duration::from_secs(2)).unwrap();
        assert!(result.detected());
        assert_eq!(result.attempts(), 3);
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_bad_screen_index_aborts_wait() {
        let config = VisionConfig { screen_index: 3, ..Default::default() };
        let h = harness(config, 0, "Dashboard", 0.0);
        let err = h.vision.wait_text("Dashboard", Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, VisionError::Capture(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let h = harness(VisionConfig::default(), 0, "Dashboard", 0.0);
        assert!(matches!(
            h.vision.wait_text("Dashboard", Duration::ZERO),
            Err(VisionError::InvalidTimeout)
        ));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let config = VisionConfig {
            region: Some(RelativeRect { x: 0.0, y: 0.0, width: 0.0, height: 1.0 }),
            ..Default::default()
        };
        let h = harness(config, 0, "Dashboard", 0.0);
        assert!(matches!(h.vision.observe(), Err(VisionError::InvalidRegion(_))));
    }

    #[test]
    fn test_text_result_carries_ocr_output() {
        let h = harness(VisionConfig::default(), 0, "  Welcome to the Dashboard\n", 0.0);
        let result = h.vision.wait_text("dashboard", Duration::from_secs(1)).unwrap();
        assert_eq!(result.text(), Some("Welcome to the Dashboard"));
        assert_eq!(result.icon(), None);
    }

    #[test]
    fn test_icon_wait_uses_threshold() {
        let h = harness(VisionConfig::default(), 0, "", 0.75);
        let icon = h.dir.path().join("icon.png");
        GrayImage::from_pixel(4, 4, Luma([255])).save(&icon).unwrap();

        let hit = h.vision.wait_icon(&icon, Duration::from_secs(1), 0.7).unwrap();
        assert!(hit.detected());
        assert_eq!(hit.confidence(), 0.75);
        assert_eq!(hit.icon(), Some(icon.display().to_string().as_str()));

        let miss = h.vision.wait_icon(&icon, Duration::from_millis(400), 0.8).unwrap();
        assert!(!miss.detected());
        assert_eq!(miss.confidence(), 0.75);
        assert_eq!(miss.reason(), Some("timeout"));
    }

    #[test]
    fn test_missing_icon_fails_before_capture() {
        let h = harness(VisionConfig::default(), 0, "", 1.0);
        let missing = h.dir.path().join("missing.png");
        match h.vision.wait_icon(&missing, Duration::from_secs(1), 0.8) {
            Err(VisionError::IconNotFound(p)) => assert_eq!(p, missing),
            other => panic!("expected IconNotFound, got {:?}", other.map(|r| r.attempts())),
        }
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_learn_persists_patterns() {
        let mut h = harness(VisionConfig::default(), 0, "", 0.0);
        h.vision.learn("login", "Sign in").unwrap();
        h.vision.learn_icon("gear", "icons/gear.png").unwrap();
        assert_eq!(h.vision.patterns().len(), 2);

        let reopened = PatternStore::open(h.dir.path().join("patterns.json")).unwrap();
        assert_eq!(reopened.get("login").unwrap().value, "Sign in");
    }

    #[test]
    fn test_corrupt_pattern_file_fails_construction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let config = VisionConfig { patterns_file: Some(path), ..Default::default() };
        let result = VisionMode::with_backends(
            config,
            Box::new(FlakyCapture { flaky: 0, calls: Arc::new(AtomicUsize::new(0)) }),
            Box::new(FixedOcr("")),
            Box::new(FixedScore(0.0)),
        );
        assert!(matches!(result, Err(VisionError::Patterns(_))));
    }
}
