//! Screen capture backends.
//!
//! This module provides:
//! - The `CaptureBackend` trait that waits poll through
//! - `MonitorCapture`, a multi-monitor backend (feature `xcap`)
//! - `PrimaryScreenCapture`, a primary-screen-only fallback
//! - Frame helpers (`capture_frame`, `crop_region`)

#[cfg(windows)]
mod gdi;
#[cfg(feature = "xcap")]
pub mod monitor;
pub mod screenshot;

#[cfg(feature = "xcap")]
pub use monitor::MonitorCapture;
pub use screenshot::PrimaryScreenCapture;

use anyhow::Result;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

use crate::config::RelativeRect;

/// Capture failures that retrying cannot fix.
#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("screen_index {index} out of range (0-{})", count.saturating_sub(1))]
    MonitorOutOfRange { index: usize, count: usize },
    #[error("no usable capture backend on this system")]
    NoBackend,
}

/// Something that can grab a frame from a monitor.
pub trait CaptureBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Number of monitors this backend can address.
    fn monitor_count(&self) -> Result<usize>;

    /// Captures the whole monitor at physical resolution.
    ///
    /// Must fail with `CaptureError::MonitorOutOfRange` for an unknown index.
    fn capture(&self, monitor: usize) -> Result<RgbaImage>;

    /// Logical (point) size of the monitor, as seen by DPI-unaware code.
    fn logical_size(&self, monitor: usize) -> Result<(u32, u32)>;
}

impl<T: CaptureBackend + ?Sized> CaptureBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn monitor_count(&self) -> Result<usize> {
        (**self).monitor_count()
    }

    fn capture(&self, monitor: usize) -> Result<RgbaImage> {
        (**self).capture(monitor)
    }

    fn logical_size(&self, monitor: usize) -> Result<(u32, u32)> {
        (**self).logical_size(monitor)
    }
}

/// Picks the capture backend once: the multi-monitor backend when it is
/// compiled in and finds a monitor, the primary-screen fallback otherwise.
pub fn default_backend() -> Box<dyn CaptureBackend> {
    #[cfg(feature = "xcap")]
    {
        match MonitorCapture::new() {
            Ok(backend) => {
                crate::log("Using multi-monitor capture backend");
                return Box::new(backend);
            }
            Err(e) => {
                crate::log(&format!(
                    "Multi-monitor capture unavailable ({:#}), falling back to primary screen",
                    e
                ));
            }
        }
    }

    crate::log("Using primary-screen capture backend (single monitor)");
    Box::new(PrimaryScreenCapture::new())
}

/// True when `err` means capture is misconfigured rather than flaky.
pub fn is_structural(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CaptureError>().is_some()
}

/// Captures one frame, optionally grayscale and cropped to `region`.
pub fn capture_frame(
    backend: &dyn CaptureBackend,
    monitor: usize,
    grayscale: bool,
    region: Option<&RelativeRect>,
) -> Result<DynamicImage> {
    let mut frame = backend.capture(monitor)?;
    if let Some(region) = region {
        frame = crop_region(&frame, region);
    }
    let frame = DynamicImage::ImageRgba8(frame);
    if grayscale {
        Ok(DynamicImage::ImageLuma8(frame.to_luma8()))
    } else {
        Ok(frame)
    }
}

/// Crops a sub-region from an image using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamps to image bounds, and returns the cropped sub-image.
pub fn crop_region(img: &RgbaImage, region: &RelativeRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = ((region.x.max(0.0) * w as f32) as u32).min(w);
    let y0 = ((region.y.max(0.0) * h as f32) as u32).min(h);
    let rw = ((region.width.max(0.0) * w as f32) as u32).min(w - x0);
    let rh = ((region.height.max(0.0) * h as f32) as u32).min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}
