use anyhow::{anyhow, Result};
use image::GrayImage;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::find_tessdata_dir;

/// Runs the Tesseract binary at `tesseract_exe` on a grayscale image and
/// returns the raw text.
///
/// Uses page segmentation mode 3 (fully automatic) since a screen holds
/// many unrelated blocks of text.
pub fn recognize_text(tesseract_exe: &Path, img: &GrayImage, lang: &str) -> Result<String> {
    // Save image to temporary file
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    let mut command = Command::new(tesseract_exe);
    command.arg(temp_input.path()).arg("stdout");
    if let Some(tessdata_dir) = find_tessdata_dir(lang) {
        command.arg("--tessdata-dir").arg(tessdata_dir);
    }
    let output = command.arg("-l").arg(lang).arg("--psm").arg("3").output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
