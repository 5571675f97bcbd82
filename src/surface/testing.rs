//! In-memory surface that records every call, for exercising controllers
//! without a host.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::processing::layout::{Placement, Size};
use crate::source::MediaSource;
use crate::surface::{MediaId, Surface, SurfaceCapabilities, TargetId};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Mount(TargetId),
    Unmount(TargetId),
    Loading(bool),
    BeginLoad(MediaId, MediaSource, bool),
    Insert(MediaId, f32),
    FadeIn(MediaId, Duration),
    Remove(MediaId),
    Place(MediaId, Placement),
    Play(MediaId),
    Pause(MediaId),
    Hover(TargetId, bool),
    ObserveTarget(TargetId, bool),
    ObserveViewport(bool),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<Op>,
    pub frame: Option<Size>,
    pub frames: HashMap<TargetId, Size>,
    pub native_image_cover: bool,
    /// Targets whose `mount` should fail.
    pub reject_mount: Vec<TargetId>,
}

impl RecordingSurface {
    pub fn with_frame(width: f64, height: f64) -> Self {
        Self {
            frame: Some(Size::new(width, height)),
            ..Self::default()
        }
    }

    /// Sources passed to `begin_load`, in order.
    pub fn loads(&self) -> Vec<MediaSource> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::BeginLoad(_, source, _) => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn viewport_observed(&self) -> bool {
        self.ops
            .iter()
            .rev()
            .find_map(|op| match op {
                Op::ObserveViewport(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn placements_of(&self, media: MediaId) -> Vec<Placement> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Place(id, placement) if *id == media => Some(*placement),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn capabilities(&self) -> SurfaceCapabilities {
        SurfaceCapabilities {
            native_image_cover: self.native_image_cover,
        }
    }

    fn mount(&mut self, target: &TargetId) -> Result<()> {
        if self.reject_mount.contains(target) {
            return Err(Error::Surface(format!("no element matches {target}")));
        }
        self.ops.push(Op::Mount(target.clone()));
        Ok(())
    }

    fn unmount(&mut self, target: &TargetId) {
        self.ops.push(Op::Unmount(target.clone()));
    }

    fn frame_size(&self, target: &TargetId) -> Option<Size> {
        self.frames.get(target).copied().or(self.frame)
    }

    fn set_loading(&mut self, _target: &TargetId, loading: bool) {
        self.ops.push(Op::Loading(loading));
    }

    fn begin_load(&mut self, _target: &TargetId, media: MediaId, source: &MediaSource, looping: bool) {
        self.ops.push(Op::BeginLoad(media, source.clone(), looping));
    }

    fn insert_media(&mut self, _target: &TargetId, media: MediaId, opacity: f32) {
        self.ops.push(Op::Insert(media, opacity));
    }

    fn fade_in(&mut self, _target: &TargetId, media: MediaId, duration: Duration) {
        self.ops.push(Op::FadeIn(media, duration));
    }

    fn remove_media(&mut self, _target: &TargetId, media: MediaId) {
        self.ops.push(Op::Remove(media));
    }

    fn place_media(&mut self, _target: &TargetId, media: MediaId, placement: Placement) {
        self.ops.push(Op::Place(media, placement));
    }

    fn play(&mut self, _target: &TargetId, media: MediaId) {
        self.ops.push(Op::Play(media));
    }

    fn pause(&mut self, _target: &TargetId, media: MediaId) {
        self.ops.push(Op::Pause(media));
    }

    fn set_hover_playback(&mut self, target: &TargetId, enabled: bool) {
        self.ops.push(Op::Hover(target.clone(), enabled));
    }

    fn observe_target_resize(&mut self, target: &TargetId, enabled: bool) {
        self.ops.push(Op::ObserveTarget(target.clone(), enabled));
    }

    fn observe_viewport_resize(&mut self, enabled: bool) {
        self.ops.push(Op::ObserveViewport(enabled));
    }
}
