//! Multi-monitor capture through `xcap`.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use xcap::Monitor;

use super::{CaptureBackend, CaptureError};

/// Captures any attached monitor by index (0 = first monitor reported by
/// the platform).
///
/// Monitors are enumerated on every call, so hot-plugging between waits is
/// picked up.
#[derive(Debug)]
pub struct MonitorCapture;

impl MonitorCapture {
    /// Fails when the platform reports no monitor at all.
    pub fn new() -> Result<Self> {
        let monitors = Monitor::all().context("Failed to enumerate monitors")?;
        if monitors.is_empty() {
            return Err(CaptureError::NoBackend.into());
        }
        crate::log(&format!("Found {} monitor(s)", monitors.len()));
        Ok(Self)
    }

    fn monitor(index: usize) -> Result<Monitor> {
        let mut monitors = Monitor::all().context("Failed to enumerate monitors")?;
        let count = monitors.len();
        if index >= count {
            return Err(CaptureError::MonitorOutOfRange { index, count }.into());
        }
        Ok(monitors.swap_remove(index))
    }
}

impl CaptureBackend for MonitorCapture {
    fn name(&self) -> &'static str {
        "xcap"
    }

    fn monitor_count(&self) -> Result<usize> {
        Ok(Monitor::all().context("Failed to enumerate monitors")?.len())
    }

    fn capture(&self, monitor: usize) -> Result<RgbaImage> {
        let shot = Self::monitor(monitor)?
            .capture_image()
            .map_err(|e| anyhow!("Monitor {} capture failed: {}", monitor, e))?;
        // xcap may link a different `image` release; go through raw bytes.
        let (width, height) = (shot.width(), shot.height());
        RgbaImage::from_raw(width, height, shot.into_raw())
            .ok_or_else(|| anyhow!("Monitor {} returned a truncated frame", monitor))
    }

    fn logical_size(&self, monitor: usize) -> Result<(u32, u32)> {
        let m = Self::monitor(monitor)?;
        Ok((m.width(), m.height()))
    }
}
