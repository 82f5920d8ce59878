//! DPI/Retina correction for icon templates.
//!
//! Icons are usually cut from screenshots at logical resolution, while
//! frames come back at physical resolution. The ratio between the two is
//! measured once per detector and applied to the icon when it is loaded.

use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use image::GrayImage;
use std::path::Path;
use std::sync::OnceLock;

use crate::capture::CaptureBackend;
use crate::error::VisionError;

/// Largest allowed difference between the X and Y ratios.
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Measures `frame pixels / logical size` for one monitor.
///
/// Fails when the two axes disagree, which means the logical size belongs
/// to a different monitor than the one captured.
pub fn measure_scale(backend: &dyn CaptureBackend, monitor: usize) -> Result<f64> {
    let (logical_w, logical_h) = backend.logical_size(monitor)?;
    if logical_w == 0 || logical_h == 0 {
        return Err(anyhow!("Monitor {} reports an empty logical size", monitor));
    }

    let frame = backend.capture(monitor)?;
    let scale_x = frame.width() as f64 / logical_w as f64;
    let scale_y = frame.height() as f64 / logical_h as f64;
    if (scale_x - scale_y).abs() > ASPECT_TOLERANCE {
        return Err(anyhow!(
            "Aspect ratio differs between X and Y ({:.3} vs {:.3})",
            scale_x,
            scale_y
        ));
    }
    if !scale_x.is_finite() || scale_x <= 0.0 {
        return Err(anyhow!("Invalid scale {}", scale_x));
    }
    Ok(scale_x)
}

/// Like `measure_scale`, but any failure yields 1.0.
pub fn detect_scale(backend: &dyn CaptureBackend, monitor: usize) -> f64 {
    match measure_scale(backend, monitor) {
        Ok(scale) => {
            crate::log(&format!("Screen scale for monitor {}: {:.3}", monitor, scale));
            scale
        }
        Err(e) => {
            crate::log(&format!(
                "Scale detection failed for monitor {} ({:#}), using 1.0",
                monitor, e
            ));
            1.0
        }
    }
}

/// Lazily measured, cached scale factor for one monitor.
#[derive(Debug)]
pub struct ScaleDetector {
    monitor: usize,
    scale: OnceLock<f64>,
}

impl ScaleDetector {
    pub fn new(monitor: usize) -> Self {
        Self {
            monitor,
            scale: OnceLock::new(),
        }
    }

    /// The monitor's scale, measured on first use.
    pub fn scale(&self, backend: &dyn CaptureBackend) -> f64 {
        *self.scale.get_or_init(|| detect_scale(backend, self.monitor))
    }
}

/// Loads an icon as grayscale and resizes it by `scale`.
pub fn load_icon(path: &Path, scale: f64) -> Result<GrayImage, VisionError> {
    if !path.is_file() {
        return Err(VisionError::IconNotFound(path.to_path_buf()));
    }
    let icon = image::open(path)
        .map_err(|source| VisionError::IconUnreadable {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    Ok(scale_icon(icon, scale))
}

/// Resizes an icon by `scale` (area-averaging filter). A scale of 1.0 or an
/// invalid scale leaves the icon untouched.
pub fn scale_icon(icon: GrayImage, scale: f64) -> GrayImage {
    if !scale.is_finite() || scale <= 0.0 || (scale - 1.0).abs() < f64::EPSILON {
        return icon;
    }
    let new_w = ((icon.width() as f64 * scale) as u32).max(1);
    let new_h = ((icon.height() as f64 * scale) as u32).max(1);
    image::imageops::resize(&icon, new_w, new_h, FilterType::Triangle)
}
