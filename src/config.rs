//! Configuration for visual waits.
//!
//! Loaded from a JSON file (by default `~/.nano-wait/config.json`). Every
//! field has a default, so a partial or missing file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used to restrict detection to part of the captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl RelativeRect {
    /// True when the rect starts inside the frame and has a positive size.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && (0.0..1.0).contains(&self.x)
            && (0.0..1.0).contains(&self.y)
    }
}

/// Complete vision configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Monitor used for capture and scale detection (0 = primary)
    #[serde(default)]
    pub screen_index: usize,
    /// Timeout used by the adapter and the CLI when none is given (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Default template-match threshold for icon waits (0.0-1.0)
    #[serde(default = "default_icon_threshold")]
    pub icon_threshold: f64,
    /// Print a diagnostic report when a wait times out
    #[serde(default)]
    pub verbose: bool,
    /// Same effect as `verbose`
    #[serde(default)]
    pub diagnostic: bool,
    /// Optional sub-region of the frame to run detection on
    #[serde(default)]
    pub region: Option<RelativeRect>,
    /// Overrides the pattern file location
    #[serde(default)]
    pub patterns_file: Option<PathBuf>,
    /// Mirror log lines to `~/.nano-wait/logs/vision.log`
    #[serde(default)]
    pub log_to_file: bool,
    /// Tesseract language code(s), e.g. `eng` or `eng+por`
    #[serde(default = "default_tesseract_lang")]
    pub tesseract_lang: String,
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_icon_threshold() -> f64 {
    0.8
}

fn default_tesseract_lang() -> String {
    "eng".to_string()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            screen_index: 0,
            timeout_secs: default_timeout_secs(),
            icon_threshold: default_icon_threshold(),
            verbose: false,
            diagnostic: false,
            region: None,
            patterns_file: None,
            log_to_file: false,
            tesseract_lang: default_tesseract_lang(),
        }
    }
}

impl VisionConfig {
    /// Loads configuration from `path`, or returns defaults when the file is
    /// missing or cannot be parsed.
    pub fn load(path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", path.display()));

        if !path.exists() {
            crate::log("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded");
                    config
                }
                Err(e) => {
                    crate::log(&format!("Failed to parse {}: {}. Using defaults.", path.display(), e));
                    Self::default()
                }
            },
            Err(e) => {
                crate::log(&format!("Failed to read {}: {}. Using defaults.", path.display(), e));
                Self::default()
            }
        }
    }

    /// Loads `~/.nano-wait/config.json`.
    pub fn load_default() -> Self {
        Self::load(&crate::paths::get_config_file())
    }

    /// Default wait timeout as a `Duration`. Non-positive or unrepresentable
    /// values fall back to ten seconds.
    pub fn timeout(&self) -> Duration {
        let fallback = Duration::from_secs_f64(default_timeout_secs());
        if self.timeout_secs <= 0.0 {
            return fallback;
        }
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or_else(|_| {
            crate::log(&format!(
                "timeout_secs {} is out of range, using {:?}",
                self.timeout_secs, fallback
            ));
            fallback
        })
    }

    /// Location of the pattern file.
    pub fn patterns_path(&self) -> PathBuf {
        self.patterns_file
            .clone()
            .unwrap_or_else(crate::paths::get_patterns_file)
    }

    /// True when timed-out waits should print their report.
    pub fn reports_diagnostics(&self) -> bool {
        self.verbose || self.diagnostic
    }
}
