use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::WallpaperOptions;
use crate::error::{Error, Result};
use crate::events::WallpaperEvent;
use crate::processing::layout::{Placement, Size, check_natural, cover};
use crate::source::{MediaKind, MediaSource};
use crate::surface::{MediaId, MediaIds, Surface, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Idle,
    Loading { media: MediaId, since: Instant },
    FadingIn { media: MediaId },
}

/// Result of a load request. Only `Started` changes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Started(MediaId),
    /// Same source as the one already shown; `Loaded` was re-emitted.
    Repeat,
    /// Another swap is in flight; the request was ignored.
    Dropped,
}

#[derive(Debug, Clone)]
struct MediaSlot {
    id: MediaId,
    source: MediaSource,
    natural: Size,
    placement: Option<Placement>,
}

impl MediaSlot {
    fn kind(&self) -> MediaKind {
        self.source.kind()
    }
}

/// One wallpaper attachment: at most a current and an incoming element, and a
/// single load or fade in flight at any time.
#[derive(Debug)]
pub struct MediaSwapController {
    target: TargetId,
    options: WallpaperOptions,
    state: SwapState,
    /// Last requested source; reverts to the displayed one when a load fails.
    requested: Option<MediaSource>,
    current: Option<MediaSlot>,
    incoming: Option<MediaSlot>,
    hover_bound: bool,
    media_ids: MediaIds,
    outbox: Vec<WallpaperEvent>,
}

impl MediaSwapController {
    pub fn new(target: TargetId, options: WallpaperOptions) -> Self {
        Self::with_media_ids(target, options, MediaIds::default())
    }

    /// Draws element ids from `media_ids`, shared with other instances.
    pub fn with_media_ids(target: TargetId, options: WallpaperOptions, media_ids: MediaIds) -> Self {
        Self {
            target,
            options,
            state: SwapState::Idle,
            requested: None,
            current: None,
            incoming: None,
            hover_bound: false,
            media_ids,
            outbox: Vec::new(),
        }
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn options(&self) -> &WallpaperOptions {
        &self.options
    }

    pub fn state(&self) -> SwapState {
        self.state
    }

    /// Source of the media that is fully shown.
    pub fn displayed(&self) -> Option<&MediaSource> {
        self.current.as_ref().map(|slot| &slot.source)
    }

    /// Geometry of the topmost inserted element.
    pub fn placement(&self) -> Option<Placement> {
        self.incoming
            .as_ref()
            .or(self.current.as_ref())
            .and_then(|slot| slot.placement)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = WallpaperEvent> + '_ {
        self.outbox.drain(..)
    }

    pub fn request_load<S: Surface>(
        &mut self,
        surface: &mut S,
        source: MediaSource,
        now: Instant,
    ) -> Result<LoadOutcome> {
        if self.state != SwapState::Idle {
            debug!(wallpaper = %self.target, %source, state = ?self.state, "swap in flight; dropping load request");
            return Ok(LoadOutcome::Dropped);
        }
        if self.requested.as_ref() == Some(&source) {
            self.outbox.push(WallpaperEvent::Loaded(source));
            return Ok(LoadOutcome::Repeat);
        }
        if let MediaSource::Video(video) = &source {
            if video.is_empty() {
                let reason = "video source lists no encodings".to_owned();
                warn!(wallpaper = %self.target, %source, "load failed: {reason}");
                self.outbox.push(WallpaperEvent::LoadFailed {
                    source: source.clone(),
                    reason: reason.clone(),
                });
                return Err(Error::LoadFailure { media: source, reason });
            }
        }

        let media = self.media_ids.next();
        debug!(wallpaper = %self.target, %media, %source, "loading");
        surface.set_loading(&self.target, true);
        surface.begin_load(&self.target, media, &source, self.options.looping);
        self.requested = Some(source);
        self.state = SwapState::Loading { media, since: now };
        Ok(LoadOutcome::Started(media))
    }

    /// Host reported that `media` decoded with the given natural size.
    pub fn media_ready<S: Surface>(&mut self, surface: &mut S, media: MediaId, natural: Size) {
        if !self.is_loading(media) {
            debug!(wallpaper = %self.target, %media, "ignoring stale load completion");
            return;
        }
        let Some(source) = self.requested.clone() else {
            return;
        };
        if let Err(err) = check_natural(natural) {
            self.fail(surface, media, err.to_string());
            return;
        }

        surface.set_loading(&self.target, false);
        self.state = SwapState::FadingIn { media };
        let slot = MediaSlot {
            id: media,
            source: source.clone(),
            natural,
            placement: None,
        };

        if self.current.is_none() {
            surface.insert_media(&self.target, media, 1.0);
            self.current = Some(slot);
            self.outbox.push(WallpaperEvent::MediaInserted(source));
            self.resize(surface);
            self.finish_swap(surface);
        } else {
            surface.insert_media(&self.target, media, 0.0);
            surface.fade_in(&self.target, media, self.options.speed);
            self.incoming = Some(slot);
            self.outbox.push(WallpaperEvent::MediaInserted(source));
            self.resize(surface);
        }
    }

    pub fn media_failed<S: Surface>(&mut self, surface: &mut S, media: MediaId, reason: String) {
        if !self.is_loading(media) {
            debug!(wallpaper = %self.target, %media, "ignoring stale load failure");
            return;
        }
        self.fail(surface, media, reason);
    }

    pub fn fade_complete<S: Surface>(&mut self, surface: &mut S, media: MediaId) {
        if self.state != (SwapState::FadingIn { media }) {
            debug!(wallpaper = %self.target, %media, "ignoring stale fade completion");
            return;
        }
        let Some(incoming) = self.incoming.take() else {
            return;
        };
        if let Some(previous) = self.current.replace(incoming) {
            surface.remove_media(&self.target, previous.id);
        }
        self.finish_swap(surface);
    }

    /// Fails a load that has been outstanding longer than the configured timeout.
    pub fn tick<S: Surface>(&mut self, surface: &mut S, now: Instant) {
        let (SwapState::Loading { media, since }, Some(timeout)) =
            (self.state, self.options.load_timeout)
        else {
            return;
        };
        if now.saturating_duration_since(since) < timeout {
            return;
        }
        let Some(source) = self.requested.clone() else {
            return;
        };
        let err = Error::LoadTimeout {
            media: source,
            after: timeout,
        };
        self.fail(surface, media, err.to_string());
    }

    /// Recomputes geometry for every inserted element against the current frame.
    pub fn resize<S: Surface>(&mut self, surface: &mut S) {
        let Some(frame) = surface.frame_size(&self.target) else {
            return;
        };
        let native_images = surface.capabilities().native_image_cover;
        for slot in self.current.iter_mut().chain(self.incoming.iter_mut()) {
            if native_images && slot.kind() == MediaKind::Image {
                continue;
            }
            match cover(frame, slot.natural) {
                Ok(placement) => {
                    surface.place_media(&self.target, slot.id, placement);
                    slot.placement = Some(placement);
                }
                Err(err) => warn!(wallpaper = %self.target, media = %slot.id, "skipping resize: {err}"),
            }
        }
    }

    pub fn play<S: Surface>(&mut self, surface: &mut S) {
        if let Some(slot) = self.current.as_ref().filter(|s| s.kind() == MediaKind::Video) {
            surface.play(&self.target, slot.id);
        }
    }

    pub fn stop<S: Surface>(&mut self, surface: &mut S) {
        if let Some(slot) = self.current.as_ref().filter(|s| s.kind() == MediaKind::Video) {
            surface.pause(&self.target, slot.id);
        }
    }

    /// Removes every element this instance created and unbinds its observers.
    pub fn destroy<S: Surface>(self, surface: &mut S) {
        if let SwapState::Loading { media, .. } = self.state {
            surface.remove_media(&self.target, media);
        }
        for slot in self.incoming.iter().chain(self.current.iter()) {
            surface.remove_media(&self.target, slot.id);
        }
        if self.hover_bound {
            surface.set_hover_playback(&self.target, false);
        }
        surface.observe_target_resize(&self.target, false);
        surface.unmount(&self.target);
        debug!(wallpaper = %self.target, "destroyed");
    }

    fn is_loading(&self, media: MediaId) -> bool {
        matches!(self.state, SwapState::Loading { media: m, .. } if m == media)
    }

    fn finish_swap<S: Surface>(&mut self, surface: &mut S) {
        self.state = SwapState::Idle;
        let Some(current) = self.current.as_ref() else {
            return;
        };
        info!(wallpaper = %self.target, media = %current.id, source = %current.source, "swap complete");
        let is_video = current.source.is_video();
        let id = current.id;
        self.outbox.push(WallpaperEvent::Loaded(current.source.clone()));

        if is_video && self.options.hover_play {
            if !self.hover_bound {
                surface.set_hover_playback(&self.target, true);
                self.hover_bound = true;
            }
        } else {
            if self.hover_bound {
                surface.set_hover_playback(&self.target, false);
                self.hover_bound = false;
            }
            if is_video && self.options.auto_play {
                surface.play(&self.target, id);
            }
        }
    }

    fn fail<S: Surface>(&mut self, surface: &mut S, media: MediaId, reason: String) {
        surface.remove_media(&self.target, media);
        surface.set_loading(&self.target, false);
        let failed = std::mem::replace(
            &mut self.requested,
            self.current.as_ref().map(|slot| slot.source.clone()),
        );
        self.state = SwapState::Idle;
        if let Some(source) = failed {
            warn!(wallpaper = %self.target, %media, %source, "load failed: {reason}");
            self.outbox.push(WallpaperEvent::LoadFailed { source, reason });
        }
    }
}
