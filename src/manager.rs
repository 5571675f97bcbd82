use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::{OptionOverrides, WallpaperOptions};
use crate::error::{Error, Result};
use crate::events::{Notification, WallpaperEvent};
use crate::processing::layout::{Placement, Size};
use crate::source::MediaSource;
use crate::swap::{LoadOutcome, MediaSwapController};
use crate::surface::{InstanceId, MediaId, MediaIds, Surface, TargetId};

/// Registry of live wallpapers sharing one surface.
///
/// Owns the shared viewport-resize subscription: it is bound when the first
/// instance attaches and released when the last one is destroyed.
pub struct WallpaperManager<S: Surface> {
    surface: S,
    defaults: WallpaperOptions,
    instances: BTreeMap<InstanceId, MediaSwapController>,
    targets: HashMap<TargetId, InstanceId>,
    next_instance: u64,
    media_ids: MediaIds,
    viewport_bound: bool,
    notify: UnboundedSender<Notification>,
}

impl<S: Surface> WallpaperManager<S> {
    pub fn new(surface: S, defaults: WallpaperOptions, notify: UnboundedSender<Notification>) -> Self {
        Self {
            surface,
            defaults,
            instances: BTreeMap::new(),
            targets: HashMap::new(),
            next_instance: 0,
            media_ids: MediaIds::default(),
            viewport_bound: false,
            notify,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn defaults(&self) -> &WallpaperOptions {
        &self.defaults
    }

    /// Changes the options later attaches start from. Live instances keep theirs.
    pub fn set_defaults(&mut self, overrides: &OptionOverrides) {
        self.defaults = self.defaults.merged(overrides);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn is_viewport_bound(&self) -> bool {
        self.viewport_bound
    }

    pub fn instance(&self, id: InstanceId) -> Option<&MediaSwapController> {
        self.instances.get(&id)
    }

    pub fn instance_for(&self, target: &TargetId) -> Option<InstanceId> {
        self.targets.get(target).copied()
    }

    pub fn placement(&self, id: InstanceId) -> Option<Placement> {
        self.instances.get(&id).and_then(MediaSwapController::placement)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &MediaSwapController)> {
        self.instances.iter().map(|(id, c)| (*id, c))
    }

    pub fn attach(
        &mut self,
        target: TargetId,
        overrides: &OptionOverrides,
        now: Instant,
    ) -> Result<InstanceId> {
        if self.targets.contains_key(&target) {
            return Err(Error::AlreadyAttached(target.0));
        }
        let options = self.defaults.merged(overrides);
        self.surface.mount(&target)?;
        self.surface.observe_target_resize(&target, true);

        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        info!(instance = %id, wallpaper = %target, "attached");

        let initial = options.source.clone();
        let mut controller =
            MediaSwapController::with_media_ids(target.clone(), options, self.media_ids.clone());
        if let Some(source) = initial {
            if let Err(err) = controller.request_load(&mut self.surface, source, now) {
                warn!(instance = %id, wallpaper = %target, "initial load rejected: {err}");
            }
        }
        self.targets.insert(target, id);
        self.instances.insert(id, controller);

        if !self.viewport_bound {
            self.surface.observe_viewport_resize(true);
            self.viewport_bound = true;
        }

        self.flush(id);
        self.emit(id, WallpaperEvent::Ready);
        Ok(id)
    }

    pub fn load(&mut self, id: InstanceId, source: MediaSource, now: Instant) -> Result<LoadOutcome> {
        let controller = self.instances.get_mut(&id).ok_or(Error::UnknownInstance(id.0))?;
        let outcome = controller.request_load(&mut self.surface, source, now);
        self.flush(id);
        outcome
    }

    pub fn play(&mut self, id: InstanceId) -> Result<()> {
        let controller = self.instances.get_mut(&id).ok_or(Error::UnknownInstance(id.0))?;
        controller.play(&mut self.surface);
        Ok(())
    }

    pub fn stop(&mut self, id: InstanceId) -> Result<()> {
        let controller = self.instances.get_mut(&id).ok_or(Error::UnknownInstance(id.0))?;
        controller.stop(&mut self.surface);
        Ok(())
    }

    pub fn destroy(&mut self, id: InstanceId) -> Result<()> {
        let controller = self.instances.remove(&id).ok_or(Error::UnknownInstance(id.0))?;
        self.targets.remove(controller.target());
        info!(instance = %id, wallpaper = %controller.target(), "destroying");
        controller.destroy(&mut self.surface);

        if self.instances.is_empty() && self.viewport_bound {
            self.surface.observe_viewport_resize(false);
            self.viewport_bound = false;
        }
        Ok(())
    }

    /// Destroys every instance, releasing the shared resize subscription.
    pub fn shutdown(&mut self) {
        let ids: Vec<_> = self.instances.keys().copied().collect();
        for id in ids {
            let _ = self.destroy(id);
        }
    }

    /// Shared viewport resize: recompute every live instance.
    pub fn viewport_resized(&mut self) {
        debug!(count = self.instances.len(), "viewport resized");
        for controller in self.instances.values_mut() {
            controller.resize(&mut self.surface);
        }
    }

    pub fn target_resized(&mut self, target: &TargetId) {
        if let Some(controller) = self.targets.get(target).and_then(|id| self.instances.get_mut(id)) {
            controller.resize(&mut self.surface);
        }
    }

    pub fn pointer_entered(&mut self, target: &TargetId) {
        if let Some(controller) = self.targets.get(target).and_then(|id| self.instances.get_mut(id)) {
            if controller.options().hover_play {
                controller.play(&mut self.surface);
            }
        }
    }

    pub fn pointer_left(&mut self, target: &TargetId) {
        if let Some(controller) = self.targets.get(target).and_then(|id| self.instances.get_mut(id)) {
            if controller.options().hover_play {
                controller.stop(&mut self.surface);
            }
        }
    }

    pub fn media_ready(&mut self, target: &TargetId, media: MediaId, natural: Size) {
        let Some(id) = self.instance_for(target) else {
            debug!(wallpaper = %target, %media, "load completed for detached target");
            return;
        };
        if let Some(controller) = self.instances.get_mut(&id) {
            controller.media_ready(&mut self.surface, media, natural);
        }
        self.flush(id);
    }

    pub fn media_failed(&mut self, target: &TargetId, media: MediaId, reason: String) {
        let Some(id) = self.instance_for(target) else {
            debug!(wallpaper = %target, %media, "load failed for detached target");
            return;
        };
        if let Some(controller) = self.instances.get_mut(&id) {
            controller.media_failed(&mut self.surface, media, reason);
        }
        self.flush(id);
    }

    pub fn fade_complete(&mut self, target: &TargetId, media: MediaId) {
        let Some(id) = self.instance_for(target) else {
            return;
        };
        if let Some(controller) = self.instances.get_mut(&id) {
            controller.fade_complete(&mut self.surface, media);
        }
        self.flush(id);
    }

    /// Fails loads that outlived their timeout.
    pub fn tick(&mut self, now: Instant) {
        let ids: Vec<_> = self.instances.keys().copied().collect();
        for id in ids {
            if let Some(controller) = self.instances.get_mut(&id) {
                controller.tick(&mut self.surface, now);
            }
            self.flush(id);
        }
    }

    fn flush(&mut self, id: InstanceId) {
        let Some(controller) = self.instances.get_mut(&id) else {
            return;
        };
        let target = controller.target().clone();
        let events: Vec<_> = controller.drain_events().collect();
        for event in events {
            self.send(id, target.clone(), event);
        }
    }

    fn emit(&mut self, id: InstanceId, event: WallpaperEvent) {
        if let Some(controller) = self.instances.get(&id) {
            let target = controller.target().clone();
            self.send(id, target, event);
        }
    }

    fn send(&self, instance: InstanceId, target: TargetId, event: WallpaperEvent) {
        if self
            .notify
            .send(Notification {
                instance,
                target,
                event,
            })
            .is_err()
        {
            debug!(%instance, "notification receiver dropped");
        }
    }
}
