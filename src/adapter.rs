//! Selenium-style wait adapter.
//!
//! A thin wrapper that fixes the timeout once and forwards to `VisionMode`,
//! so test code reads `wait.until_text("Dashboard")`.

use std::path::Path;
use std::time::Duration;

use crate::config::VisionConfig;
use crate::error::Result;
use crate::vision::{VisionMode, VisionResult};

/// Waits with a fixed timeout.
pub struct VisionWait {
    timeout: Duration,
    vision: VisionMode,
}

impl VisionWait {
    /// Builds an adapter over a default `VisionMode`.
    pub fn new(timeout: Duration, verbose: bool) -> Result<Self> {
        let config = VisionConfig {
            verbose,
            ..Default::default()
        };
        Ok(Self::with_vision(VisionMode::new(config)?, timeout))
    }

    /// Builds an adapter using the timeout from `config`.
    pub fn from_config(config: VisionConfig) -> Result<Self> {
        let timeout = config.timeout();
        Ok(Self::with_vision(VisionMode::new(config)?, timeout))
    }

    pub fn with_vision(vision: VisionMode, timeout: Duration) -> Self {
        Self { timeout, vision }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn vision(&self) -> &VisionMode {
        &self.vision
    }

    pub fn until_text(&self, text: &str) -> Result<VisionResult> {
        self.vision.wait_text(text, self.timeout)
    }

    pub fn until_icon(&self, icon_path: impl AsRef<Path>, threshold: f64) -> Result<VisionResult> {
        self.vision.wait_icon(icon_path, self.timeout, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureBackend;
    use crate::ocr::TextRecognizer;
    use crate::vision::{Clock, TemplateMatcher};
    use image::{DynamicImage, GrayImage, RgbaImage};
    use std::sync::Mutex;
    use std::time::Instant;
    use tempfile::tempdir;

    struct Blank;

    impl CaptureBackend for Blank {
        fn name(&self) -> &'static str {
            "blank"
        }

        fn monitor_count(&self) -> anyhow::Result<usize> {
            Ok(1)
        }

        fn capture(&self, _monitor: usize) -> anyhow::Result<RgbaImage> {
            Ok(RgbaImage::new(32, 32))
        }

        fn logical_size(&self, _monitor: usize) -> anyhow::Result<(u32, u32)> {
            Ok((32, 32))
        }
    }

    struct Says(&'static str);

    impl TextRecognizer for Says {
        fn extract_text(&self, _frame: &DynamicImage) -> String {
            self.0.to_string()
        }
    }

    struct Never;

    impl TemplateMatcher for Never {
        fn match_template(&self, _frame: &GrayImage, _template: &GrayImage) -> f64 {
            0.0
        }
    }

    struct Virtual {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl Clock for Virtual {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
        }
    }

    #[test]
    fn test_until_text_uses_fixed_timeout() {
        let dir = tempdir().unwrap();
        let config = VisionConfig {
            patterns_file: Some(dir.path().join("p.json")),
            ..Default::default()
        };
        let vision = VisionMode::with_backends(config, Box::new(Blank), Box::new(Says("Login")), Box::new(Never))
            .unwrap()
            .with_clock(Box::new(Virtual { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }));
        let wait = VisionWait::with_vision(vision, Duration::from_secs(1));

        assert!(wait.until_text("Login").unwrap().detected());

        let missed = wait.until_text("Checkout complete").unwrap();
        assert!(!missed.detected());
        assert_eq!(missed.elapsed(), wait.timeout());
    }
}
