//! Host environment contract.
//!
//! A `Surface` is whatever owns the real containers and media elements (a
//! browser DOM, a compositor, a headless probe). Controllers only ever talk to
//! it through these calls; completions come back later as
//! [`StageCommand`](crate::events::StageCommand)s or direct manager calls.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::processing::layout::{Placement, Size};
use crate::source::MediaSource;

pub mod testing;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Media element handle, unique across every instance drawing from the same
/// [`MediaIds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MediaId(pub u64);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Shared `MediaId` counter. Host completions are routed by target only, so a
/// re-attached target must never reuse an id its previous instance handed out.
#[derive(Debug, Clone, Default)]
pub struct MediaIds(Arc<AtomicU64>);

impl MediaIds {
    pub fn next(&self) -> MediaId {
        MediaId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// Images are cover-scaled by the host itself (CSS `background-size`),
    /// so only video geometry needs to be pushed.
    pub native_image_cover: bool,
}

pub trait Surface {
    fn capabilities(&self) -> SurfaceCapabilities {
        SurfaceCapabilities::default()
    }

    /// Creates the media holder inside `target` and marks it as a wallpaper.
    fn mount(&mut self, target: &TargetId) -> Result<()>;

    /// Removes the holder and everything in it.
    fn unmount(&mut self, target: &TargetId);

    /// Outer size of the target, if it is currently laid out.
    fn frame_size(&self, target: &TargetId) -> Option<Size>;

    fn set_loading(&mut self, _target: &TargetId, _loading: bool) {}

    /// Starts an asynchronous load. The host must later report exactly one of
    /// ready (with natural dimensions) or failed for `media`.
    fn begin_load(&mut self, target: &TargetId, media: MediaId, source: &MediaSource, looping: bool);

    fn insert_media(&mut self, target: &TargetId, media: MediaId, opacity: f32);

    /// Animates opacity to 1 over `duration`, then reports completion for `media`.
    fn fade_in(&mut self, target: &TargetId, media: MediaId, duration: Duration);

    /// Drops an element, whether or not it was ever inserted.
    fn remove_media(&mut self, target: &TargetId, media: MediaId);

    fn place_media(&mut self, target: &TargetId, media: MediaId, placement: Placement);

    fn play(&mut self, _target: &TargetId, _media: MediaId) {}

    fn pause(&mut self, _target: &TargetId, _media: MediaId) {}

    /// Routes pointer enter/leave on `target` back as play/stop requests.
    fn set_hover_playback(&mut self, _target: &TargetId, _enabled: bool) {}

    fn observe_target_resize(&mut self, _target: &TargetId, _enabled: bool) {}

    /// Subscribes to the shared viewport resize event.
    fn observe_viewport_resize(&mut self, _enabled: bool) {}
}
