//! Primary-screen capture fallback.
//!
//! On Windows this reads the desktop through GDI. Elsewhere it runs the
//! platform screenshot tool into a temporary PNG and loads it back; that
//! path cannot report a logical size, so no DPI correction happens there.

use anyhow::Result;
use image::RgbaImage;

#[cfg(not(windows))]
use anyhow::{anyhow, Context};
#[cfg(not(windows))]
use std::process::Command;
#[cfg(not(windows))]
use tempfile::NamedTempFile;

use super::{CaptureBackend, CaptureError};

/// Screenshot tools tried in order; `{}` is replaced by the output path.
#[cfg(target_os = "macos")]
const SCREENSHOT_TOOLS: &[(&str, &[&str])] = &[("screencapture", &["-x", "-m", "{}"])];

#[cfg(all(not(windows), not(target_os = "macos")))]
const SCREENSHOT_TOOLS: &[(&str, &[&str])] = &[
    ("grim", &["{}"]),
    ("gnome-screenshot", &["-f", "{}"]),
    ("import", &["-window", "root", "{}"]),
];

/// Captures only the primary monitor (index 0).
#[derive(Debug, Default)]
pub struct PrimaryScreenCapture;

impl PrimaryScreenCapture {
    pub fn new() -> Self {
        Self
    }

    fn check_index(monitor: usize) -> Result<()> {
        if monitor != 0 {
            return Err(CaptureError::MonitorOutOfRange { index: monitor, count: 1 }.into());
        }
        Ok(())
    }
}

impl CaptureBackend for PrimaryScreenCapture {
    fn name(&self) -> &'static str {
        "primary-screen"
    }

    fn monitor_count(&self) -> Result<usize> {
        Ok(1)
    }

    fn capture(&self, monitor: usize) -> Result<RgbaImage> {
        Self::check_index(monitor)?;
        capture_primary()
    }

    fn logical_size(&self, monitor: usize) -> Result<(u32, u32)> {
        Self::check_index(monitor)?;
        logical_primary_size()
    }
}

#[cfg(windows)]
fn capture_primary() -> Result<RgbaImage> {
    super::gdi::capture_desktop()
}

#[cfg(windows)]
fn logical_primary_size() -> Result<(u32, u32)> {
    super::gdi::logical_screen_size()
}

#[cfg(not(windows))]
fn capture_primary() -> Result<RgbaImage> {
    let temp_output = NamedTempFile::with_suffix(".png")?;
    let output_path = temp_output.path().to_string_lossy().to_string();

    let mut failures = Vec::new();
    for (tool, args) in SCREENSHOT_TOOLS {
        let args: Vec<String> = args.iter().map(|a| a.replace("{}", &output_path)).collect();
        match Command::new(tool).args(&args).output() {
            Ok(output) if output.status.success() => {
                let img = image::open(temp_output.path())
                    .with_context(|| format!("Failed to load screenshot written by {}", tool))?;
                return Ok(img.to_rgba8());
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                failures.push(format!("{}: {}", tool, stderr.trim()));
            }
            Err(e) => failures.push(format!("{}: {}", tool, e)),
        }
    }

    Err(anyhow!("No screenshot tool succeeded ({})", failures.join("; ")))
}

/// Screenshot tools only report physical pixels, so the logical size is
/// unknown here and scale detection falls back to 1.0.
#[cfg(not(windows))]
fn logical_primary_size() -> Result<(u32, u32)> {
    Err(anyhow!(
        "logical screen size is not available from the screenshot-tool backend"
    ))
}
