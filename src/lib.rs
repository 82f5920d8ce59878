//! Nano Wait Vision
//!
//! Visual wait primitives for GUI tests. A wait repeatedly captures the
//! screen, runs OCR or template matching on the frame and reports whether
//! the target (a string or an icon image) became visible before the
//! timeout ran out.
//!
//! ```no_run
//! use nano_wait_vision::{VisionConfig, VisionMode};
//! use std::time::Duration;
//!
//! let vision = VisionMode::new(VisionConfig::default()).unwrap();
//! let state = vision.wait_text("Dashboard", Duration::from_secs(10)).unwrap();
//! if state.detected() {
//!     println!("found with confidence {:.2}", state.confidence());
//! }
//! ```

pub mod adapter;
pub mod capture;
pub mod config;
pub mod error;
pub mod ocr;
pub mod paths;
pub mod patterns;
pub mod vision;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

pub use adapter::VisionWait;
pub use capture::{CaptureBackend, CaptureError};
pub use config::{RelativeRect, VisionConfig};
pub use error::VisionError;
pub use ocr::{TesseractOcr, TextRecognizer};
pub use patterns::{Pattern, PatternKind, PatternStore};
pub use vision::{
    Clock, Diagnostics, NccMatcher, Phase, PhaseOutcome, PhaseScheduler, PhaseSummary, Probe,
    SystemClock, TargetKind, TemplateMatcher, VisionMode, VisionResult, PHASES,
};

/// Mirrors log lines into `~/.nano-wait/logs/vision.log` when set.
static FILE_LOGGING: AtomicBool = AtomicBool::new(false);

/// Enables or disables the log file mirror.
pub fn set_file_logging(enabled: bool) {
    FILE_LOGGING.store(enabled, Ordering::SeqCst);
}

/// Logs a message through the `log` facade and, if enabled, to the log
/// file with a timestamp.
pub fn log(msg: &str) {
    log::info!(target: "nano_wait_vision", "{}", msg);

    if !FILE_LOGGING.load(Ordering::SeqCst) {
        return;
    }
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    let logs_dir = paths::get_logs_dir();
    if std::fs::create_dir_all(&logs_dir).is_err() {
        return;
    }
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join("vision.log"))
    {
        let _ = file.write_all(line.as_bytes());
    }
}
