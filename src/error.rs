use std::time::Duration;

use thiserror::Error;

use crate::source::MediaSource;

/// Library error type for wallpaper operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Natural media dimensions are zero, negative, or not finite.
    #[error("invalid media dimensions {width}x{height}")]
    InvalidMedia { width: f64, height: f64 },

    /// Frame dimensions are negative or not finite.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidFrame { width: f64, height: f64 },

    /// The surface could not decode the requested media.
    #[error("failed to load {media}: {reason}")]
    LoadFailure { media: MediaSource, reason: String },

    /// The surface never reported completion for the requested media.
    #[error("loading {media} timed out after {}", humantime::format_duration(*.after))]
    LoadTimeout { media: MediaSource, after: Duration },

    /// A wallpaper is already attached to the target.
    #[error("target {0} already has a wallpaper attached")]
    AlreadyAttached(String),

    /// No live instance with this id.
    #[error("unknown wallpaper instance {0}")]
    UnknownInstance(u64),

    /// The host surface rejected an operation.
    #[error("surface error: {0}")]
    Surface(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
