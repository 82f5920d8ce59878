//! Errors surfaced by the public wait API.
//!
//! Timeouts are not errors: a wait that runs out of time returns a
//! `VisionResult` with `detected == false` and reason `timeout`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    /// The icon template does not exist on disk.
    #[error("icon not found: {}", .0.display())]
    IconNotFound(PathBuf),

    /// The icon file exists but could not be decoded.
    #[error("failed to read icon {}: {source}", path.display())]
    IconUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Waits need a strictly positive timeout.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    /// The configured crop region does not overlap the frame.
    #[error("capture region {0:?} is empty for this frame")]
    InvalidRegion(crate::config::RelativeRect),

    /// Capture is structurally broken (bad monitor index, no backend).
    #[error("capture failed: {0:#}")]
    Capture(#[source] anyhow::Error),

    /// Reading or writing the pattern file failed.
    #[error("pattern store error: {0:#}")]
    Patterns(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;
