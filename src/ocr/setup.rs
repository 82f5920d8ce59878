//! Locating the Tesseract executable and its language data.

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Environment variable that points at a specific tesseract binary.
const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

#[cfg(windows)]
const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

#[cfg(not(windows))]
const COMMON_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Finds the Tesseract executable: `TESSERACT_CMD` first, then `PATH`, then
/// common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(cmd) = std::env::var(TESSERACT_CMD_ENV) {
        let p = PathBuf::from(&cmd);
        if p.exists() {
            return Ok(p);
        }
        crate::log(&format!("{} points at missing file: {}", TESSERACT_CMD_ENV, cmd));
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds an explicit tessdata directory from `TESSDATA_PREFIX`.
///
/// Returns `None` when the variable is unset so tesseract uses its
/// compiled-in default.
pub fn find_tessdata_dir(lang: &str) -> Option<PathBuf> {
    let prefix = std::env::var("TESSDATA_PREFIX").ok()?;
    let first_lang = lang.split('+').next().unwrap_or(lang);
    let traineddata = format!("{}.traineddata", first_lang);

    let p = PathBuf::from(&prefix);
    if p.join(&traineddata).exists() {
        return Some(p);
    }
    let p = PathBuf::from(&prefix).join("tessdata");
    if p.join(&traineddata).exists() {
        return Some(p);
    }
    None
}
