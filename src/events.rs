use crate::config::OptionOverrides;
use crate::processing::layout::Size;
use crate::source::MediaSource;
use crate::surface::{InstanceId, MediaId, TargetId};

/// Emitted by an instance as its media changes.
#[derive(Debug, Clone, PartialEq)]
pub enum WallpaperEvent {
    /// The instance is attached and its initial load (if any) has been issued.
    Ready,
    /// New media finished loading and was inserted into the holder.
    MediaInserted(MediaSource),
    /// A swap completed, or the current source was requested again.
    Loaded(MediaSource),
    /// Loading failed or timed out; the instance is idle again.
    LoadFailed { source: MediaSource, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub instance: InstanceId,
    pub target: TargetId,
    pub event: WallpaperEvent,
}

/// Input to the stage task: caller requests plus host callbacks.
#[derive(Debug, Clone)]
pub enum StageCommand {
    Attach {
        target: TargetId,
        overrides: OptionOverrides,
    },
    Load {
        target: TargetId,
        source: MediaSource,
    },
    Play(TargetId),
    Stop(TargetId),
    Destroy(TargetId),
    SetDefaults(OptionOverrides),
    ViewportResized,
    TargetResized(TargetId),
    PointerEntered(TargetId),
    PointerLeft(TargetId),
    MediaReady {
        target: TargetId,
        media: MediaId,
        natural: Size,
    },
    MediaFailed {
        target: TargetId,
        media: MediaId,
        reason: String,
    },
    FadeComplete {
        target: TargetId,
        media: MediaId,
    },
    /// Processed in order with everything queued before it.
    Shutdown,
}
