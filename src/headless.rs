//! Surface without a display: media dimensions come from the loader task,
//! fades complete on a timer, and geometry is kept for inspection.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::mpsc::{Sender, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::events::StageCommand;
use crate::processing::layout::{Placement, Size};
use crate::source::MediaSource;
use crate::surface::{MediaId, Surface, TargetId};
use crate::tasks::loader::ProbeRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeMedia {
    pub source: MediaSource,
    pub looping: bool,
    pub inserted: bool,
    pub opacity: f32,
    pub placement: Option<Placement>,
    pub playing: bool,
}

#[derive(Debug, Default)]
struct Holder {
    loading: bool,
    hover_playback: bool,
    media: BTreeMap<MediaId, ProbeMedia>,
}

pub struct ProbeSurface {
    viewport: watch::Receiver<Size>,
    frames: HashMap<TargetId, Size>,
    holders: HashMap<TargetId, Holder>,
    to_loader: UnboundedSender<ProbeRequest>,
    commands: Sender<StageCommand>,
    viewport_observed: bool,
}

impl ProbeSurface {
    /// Every target is laid out at the viewport size unless given its own frame.
    pub fn new(
        viewport: watch::Receiver<Size>,
        to_loader: UnboundedSender<ProbeRequest>,
        commands: Sender<StageCommand>,
    ) -> Self {
        Self {
            viewport,
            frames: HashMap::new(),
            holders: HashMap::new(),
            to_loader,
            commands,
            viewport_observed: false,
        }
    }

    pub fn set_frame(&mut self, target: TargetId, frame: Size) {
        self.frames.insert(target, frame);
    }

    pub fn media(&self, target: &TargetId) -> Vec<(MediaId, &ProbeMedia)> {
        self.holders
            .get(target)
            .map(|h| h.media.iter().map(|(id, m)| (*id, m)).collect())
            .unwrap_or_default()
    }

    pub fn is_loading(&self, target: &TargetId) -> bool {
        self.holders.get(target).is_some_and(|h| h.loading)
    }

    pub fn hover_playback(&self, target: &TargetId) -> bool {
        self.holders.get(target).is_some_and(|h| h.hover_playback)
    }

    pub fn is_mounted(&self, target: &TargetId) -> bool {
        self.holders.contains_key(target)
    }

    pub fn viewport_observed(&self) -> bool {
        self.viewport_observed
    }

    fn entry(&mut self, target: &TargetId, media: MediaId) -> Option<&mut ProbeMedia> {
        self.holders.get_mut(target)?.media.get_mut(&media)
    }
}

impl Surface for ProbeSurface {
    fn mount(&mut self, target: &TargetId) -> Result<()> {
        if self.holders.contains_key(target) {
            return Err(Error::Surface(format!("{target} is already mounted")));
        }
        self.holders.insert(target.clone(), Holder::default());
        Ok(())
    }

    fn unmount(&mut self, target: &TargetId) {
        self.holders.remove(target);
        self.frames.remove(target);
    }

    fn frame_size(&self, target: &TargetId) -> Option<Size> {
        self.frames
            .get(target)
            .copied()
            .or_else(|| Some(*self.viewport.borrow()))
    }

    fn set_loading(&mut self, target: &TargetId, loading: bool) {
        if let Some(holder) = self.holders.get_mut(target) {
            holder.loading = loading;
        }
    }

    fn begin_load(&mut self, target: &TargetId, media: MediaId, source: &MediaSource, looping: bool) {
        if let Some(holder) = self.holders.get_mut(target) {
            holder.media.insert(
                media,
                ProbeMedia {
                    source: source.clone(),
                    looping,
                    inserted: false,
                    opacity: 0.0,
                    placement: None,
                    playing: false,
                },
            );
        }
        let request = ProbeRequest {
            target: target.clone(),
            media,
            source: source.clone(),
        };
        if self.to_loader.send(request).is_err() {
            warn!(wallpaper = %target, %media, "loader is gone");
            let failed = StageCommand::MediaFailed {
                target: target.clone(),
                media,
                reason: "loader unavailable".into(),
            };
            if let Err(err) = self.commands.try_send(failed) {
                warn!(wallpaper = %target, %media, "could not report load failure: {err}");
            }
        }
    }

    fn insert_media(&mut self, target: &TargetId, media: MediaId, opacity: f32) {
        if let Some(entry) = self.entry(target, media) {
            entry.inserted = true;
            entry.opacity = opacity;
        }
    }

    fn fade_in(&mut self, target: &TargetId, media: MediaId, duration: Duration) {
        if let Some(entry) = self.entry(target, media) {
            entry.opacity = 1.0;
        }
        debug!(wallpaper = %target, %media, ?duration, "fading in");
        let commands = self.commands.clone();
        let target = target.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = commands.send(StageCommand::FadeComplete { target, media }).await;
        });
    }

    fn remove_media(&mut self, target: &TargetId, media: MediaId) {
        if let Some(holder) = self.holders.get_mut(target) {
            holder.media.remove(&media);
        }
    }

    fn place_media(&mut self, target: &TargetId, media: MediaId, placement: Placement) {
        trace!(wallpaper = %target, %media, ?placement, "placed");
        if let Some(entry) = self.entry(target, media) {
            entry.placement = Some(placement);
        }
    }

    fn play(&mut self, target: &TargetId, media: MediaId) {
        if let Some(entry) = self.entry(target, media) {
            entry.playing = true;
        }
    }

    fn pause(&mut self, target: &TargetId, media: MediaId) {
        if let Some(entry) = self.entry(target, media) {
            entry.playing = false;
        }
    }

    fn set_hover_playback(&mut self, target: &TargetId, enabled: bool) {
        if let Some(holder) = self.holders.get_mut(target) {
            holder.hover_playback = enabled;
        }
    }

    fn observe_viewport_resize(&mut self, enabled: bool) {
        self.viewport_observed = enabled;
    }
}
