use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::StageCommand;
use crate::manager::WallpaperManager;
use crate::surface::{InstanceId, Surface, TargetId};

/// Owns the manager and applies commands to it one at a time.
///
/// Commands are caller requests and host callbacks alike; a periodic tick
/// fails loads that outlived their timeout. Returns the manager, still
/// populated, on `Shutdown`, cancellation, or when every sender is gone.
pub async fn run<S: Surface>(
    mut manager: WallpaperManager<S>,
    mut commands: Receiver<StageCommand>,
    cancel: CancellationToken,
    tick_every: Duration,
) -> Result<WallpaperManager<S>> {
    let mut ticker = interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_cmd = commands.recv() => {
                match maybe_cmd {
                    Some(StageCommand::Shutdown) | None => break,
                    Some(cmd) => apply(&mut manager, cmd),
                }
            }

            _ = ticker.tick() => manager.tick(Instant::now().into_std()),
        }
    }
    debug!(live = manager.len(), "stage stopped");
    Ok(manager)
}

fn apply<S: Surface>(manager: &mut WallpaperManager<S>, cmd: StageCommand) {
    let now = Instant::now().into_std();
    match cmd {
        StageCommand::Attach { target, overrides } => {
            if let Err(err) = manager.attach(target.clone(), &overrides, now) {
                warn!(wallpaper = %target, "attach failed: {err}");
            }
        }
        StageCommand::Load { target, source } => {
            let Some(id) = lookup(manager, &target) else {
                return;
            };
            match manager.load(id, source, now) {
                Ok(outcome) => debug!(wallpaper = %target, ?outcome, "load requested"),
                Err(err) => warn!(wallpaper = %target, "load rejected: {err}"),
            }
        }
        StageCommand::Play(target) => {
            if let Some(id) = lookup(manager, &target) {
                if let Err(err) = manager.play(id) {
                    warn!(wallpaper = %target, "play failed: {err}");
                }
            }
        }
        StageCommand::Stop(target) => {
            if let Some(id) = lookup(manager, &target) {
                if let Err(err) = manager.stop(id) {
                    warn!(wallpaper = %target, "stop failed: {err}");
                }
            }
        }
        StageCommand::Destroy(target) => {
            if let Some(id) = lookup(manager, &target) {
                if let Err(err) = manager.destroy(id) {
                    warn!(wallpaper = %target, "destroy failed: {err}");
                }
            }
        }
        StageCommand::SetDefaults(overrides) => manager.set_defaults(&overrides),
        StageCommand::ViewportResized => manager.viewport_resized(),
        StageCommand::TargetResized(target) => manager.target_resized(&target),
        StageCommand::PointerEntered(target) => manager.pointer_entered(&target),
        StageCommand::PointerLeft(target) => manager.pointer_left(&target),
        StageCommand::MediaReady {
            target,
            media,
            natural,
        } => manager.media_ready(&target, media, natural),
        StageCommand::MediaFailed {
            target,
            media,
            reason,
        } => manager.media_failed(&target, media, reason),
        StageCommand::FadeComplete { target, media } => manager.fade_complete(&target, media),
        StageCommand::Shutdown => {}
    }
}

fn lookup<S: Surface>(manager: &WallpaperManager<S>, target: &TargetId) -> Option<InstanceId> {
    let id = manager.instance_for(target);
    if id.is_none() {
        warn!(wallpaper = %target, "no wallpaper attached");
    }
    id
}
