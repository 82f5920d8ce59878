//! Text extraction from captured frames.
//!
//! `TextRecognizer` is the seam the waits call through; `TesseractOcr`
//! shells out to a local Tesseract install.

pub mod engine;
pub mod preprocess;
pub mod setup;

pub use engine::recognize_text;
pub use preprocess::{calculate_brightness, prepare_for_ocr};

use anyhow::{anyhow, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extracts text from a frame.
///
/// Implementations never fail: any internal error yields an empty string.
pub trait TextRecognizer: Send + Sync {
    fn extract_text(&self, frame: &DynamicImage) -> String;
}

/// Tesseract-backed recognizer.
///
/// The executable is located on first use and remembered, so polling does
/// not search `PATH` on every attempt.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    lang: String,
    executable: OnceLock<Result<PathBuf, String>>,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            executable: OnceLock::new(),
        }
    }

    /// Uses `path` as the Tesseract binary instead of searching for one.
    pub fn with_executable(lang: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let ocr = Self::new(lang);
        let _ = ocr.executable.set(Ok(path.into()));
        ocr
    }

    /// The resolved Tesseract binary.
    pub fn executable(&self) -> Result<&Path> {
        self.executable
            .get_or_init(|| {
                let found = setup::find_tesseract_executable().map_err(|e| format!("{:#}", e));
                match &found {
                    Ok(path) => crate::log(&format!("Using tesseract at {}", path.display())),
                    Err(e) => crate::log(e),
                }
                found
            })
            .as_deref()
            .map_err(|e| anyhow!("{}", e))
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl TextRecognizer for TesseractOcr {
    fn extract_text(&self, frame: &DynamicImage) -> String {
        if frame.width() == 0 || frame.height() == 0 {
            return String::new();
        }

        let prepared = prepare_for_ocr(frame);
        let text = self
            .executable()
            .and_then(|exe| recognize_text(exe, &prepared, &self.lang));
        match text {
            Ok(text) => text,
            Err(e) => {
                crate::log(&format!("OCR failed: {:#}", e));
                String::new()
            }
        }
    }
}
