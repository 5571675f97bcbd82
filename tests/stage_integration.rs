use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc::{self, Sender, UnboundedReceiver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wallpaper::config::{OptionOverrides, WallpaperOptions};
use wallpaper::events::{Notification, StageCommand, WallpaperEvent};
use wallpaper::headless::ProbeSurface;
use wallpaper::surface::TargetId;
use wallpaper::tasks::loader::{self, ProbeRequest};
use wallpaper::tasks::stage;
use wallpaper::{MediaSource, Size, SwapState, WallpaperManager};

struct Harness {
    commands: Sender<StageCommand>,
    notifications: UnboundedReceiver<Notification>,
    viewport: watch::Sender<Size>,
    stage: JoinHandle<anyhow::Result<WallpaperManager<ProbeSurface>>>,
    cancel: CancellationToken,
    // Held so a stage without a loader still has an open probe channel.
    _probes: Option<UnboundedReceiver<ProbeRequest>>,
}

impl Harness {
    fn start(root: &Path, frame: Size, with_loader: bool) -> Self {
        let (viewport_tx, viewport_rx) = watch::channel(frame);
        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let surface = ProbeSurface::new(viewport_rx, probe_tx, cmd_tx.clone());
        let defaults = WallpaperOptions {
            speed: Duration::from_millis(20),
            ..WallpaperOptions::default()
        };
        let manager = WallpaperManager::new(surface, defaults, notify_tx);

        let probes = if with_loader {
            tokio::spawn(loader::run(
                probe_rx,
                cmd_tx.clone(),
                root.to_path_buf(),
                cancel.clone(),
                2,
            ));
            None
        } else {
            Some(probe_rx)
        };
        let stage = tokio::spawn(stage::run(
            manager,
            cmd_rx,
            cancel.clone(),
            Duration::from_millis(10),
        ));
        Self {
            commands: cmd_tx,
            notifications: notify_rx,
            viewport: viewport_tx,
            stage,
            cancel,
            _probes: probes,
        }
    }

    async fn send(&self, cmd: StageCommand) {
        self.commands.send(cmd).await.unwrap();
    }

    async fn next_event(&mut self) -> Notification {
        tokio::time::timeout(Duration::from_secs(2), self.notifications.recv())
            .await
            .expect("timeout waiting for notification")
            .expect("notification channel closed")
    }

    /// Skips events until one matches.
    async fn wait_for(&mut self, pred: impl Fn(&WallpaperEvent) -> bool) -> Notification {
        loop {
            let n = self.next_event().await;
            if pred(&n.event) {
                return n;
            }
        }
    }

    async fn finish(self) -> WallpaperManager<ProbeSurface> {
        self.commands.send(StageCommand::Shutdown).await.unwrap();
        let manager = self.stage.await.unwrap().unwrap();
        self.cancel.cancel();
        manager
    }
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
    image::RgbImage::new(width, height)
        .save(dir.join(name))
        .unwrap();
}

fn attach(target: &str, overrides: OptionOverrides) -> StageCommand {
    StageCommand::Attach {
        target: target.into(),
        overrides,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attach_loads_then_cross_fades_to_next_image() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wide.png", 160, 40);
    write_png(dir.path(), "tall.png", 10, 20);
    let mut h = Harness::start(dir.path(), Size::new(80.0, 60.0), true);

    h.send(attach("hero", OptionOverrides::with_source("wide.png"))).await;
    assert_eq!(h.next_event().await.event, WallpaperEvent::Ready);
    assert_eq!(
        h.next_event().await.event,
        WallpaperEvent::MediaInserted("wide.png".into())
    );
    assert_eq!(
        h.next_event().await.event,
        WallpaperEvent::Loaded("wide.png".into())
    );

    h.send(StageCommand::Load {
        target: "hero".into(),
        source: "tall.png".into(),
    })
    .await;
    assert_eq!(
        h.next_event().await.event,
        WallpaperEvent::MediaInserted("tall.png".into())
    );
    assert_eq!(
        h.next_event().await.event,
        WallpaperEvent::Loaded("tall.png".into())
    );

    let manager = h.finish().await;
    let id = manager.instance_for(&"hero".into()).unwrap();
    let hero = manager.instance(id).unwrap();
    assert_eq!(hero.state(), SwapState::Idle);
    assert_eq!(hero.displayed(), Some(&MediaSource::image("tall.png")));
    let p = hero.placement().unwrap();
    assert_eq!((p.width, p.height, p.left, p.top), (80.0, 160.0, 0.0, -50.0));

    // The previous element is gone once the fade finished.
    let media = manager.surface().media(&"hero".into());
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].1.opacity, 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_request_in_flight_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", 4, 3);
    write_png(dir.path(), "b.png", 3, 4);
    write_png(dir.path(), "c.png", 1, 1);
    let mut h = Harness::start(dir.path(), Size::new(100.0, 100.0), true);

    h.send(attach("hero", OptionOverrides::with_source("a.png"))).await;
    h.wait_for(|e| matches!(e, WallpaperEvent::Loaded(_))).await;

    h.send(StageCommand::Load {
        target: "hero".into(),
        source: "b.png".into(),
    })
    .await;
    h.send(StageCommand::Load {
        target: "hero".into(),
        source: "c.png".into(),
    })
    .await;
    let loaded = h
        .wait_for(|e| matches!(e, WallpaperEvent::Loaded(_)))
        .await;
    assert_eq!(loaded.event, WallpaperEvent::Loaded("b.png".into()));

    let manager = h.finish().await;
    let id = manager.instance_for(&"hero".into()).unwrap();
    assert_eq!(
        manager.instance(id).unwrap().displayed(),
        Some(&MediaSource::image("b.png"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_file_fails_and_instance_stays_usable() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "ok.png", 2, 1);
    let mut h = Harness::start(dir.path(), Size::new(100.0, 100.0), true);

    h.send(attach("hero", OptionOverrides::with_source("missing.png"))).await;
    let failed = h
        .wait_for(|e| matches!(e, WallpaperEvent::LoadFailed { .. }))
        .await;
    assert_eq!(failed.target, TargetId::new("hero"));

    h.send(StageCommand::Load {
        target: "hero".into(),
        source: "ok.png".into(),
    })
    .await;
    let loaded = h
        .wait_for(|e| matches!(e, WallpaperEvent::Loaded(_)))
        .await;
    assert_eq!(loaded.event, WallpaperEvent::Loaded("ok.png".into()));
    h.finish().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unanswered_load_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::start(dir.path(), Size::new(100.0, 100.0), false);

    let overrides = OptionOverrides {
        load_timeout: Some(Duration::from_millis(50)),
        ..OptionOverrides::with_source("never.png")
    };
    h.send(attach("hero", overrides)).await;
    let failed = h
        .wait_for(|e| matches!(e, WallpaperEvent::LoadFailed { .. }))
        .await;
    let WallpaperEvent::LoadFailed { source, reason } = failed.event else {
        unreachable!();
    };
    assert_eq!(source, MediaSource::image("never.png"));
    assert!(reason.contains("timed out"), "{reason}");

    let manager = h.finish().await;
    let id = manager.instance_for(&"hero".into()).unwrap();
    assert_eq!(manager.instance(id).unwrap().state(), SwapState::Idle);
    assert!(!manager.surface().is_loading(&"hero".into()));
    assert!(manager.surface().media(&"hero".into()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn viewport_resize_reaches_every_wallpaper() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wide.png", 1600, 400);
    write_png(dir.path(), "tall.png", 100, 200);
    let mut h = Harness::start(dir.path(), Size::new(800.0, 600.0), true);

    h.send(attach("a", OptionOverrides::with_source("wide.png"))).await;
    h.send(attach("b", OptionOverrides::with_source("tall.png"))).await;
    let mut settled = 0;
    while settled < 2 {
        if matches!(h.next_event().await.event, WallpaperEvent::Loaded(_)) {
            settled += 1;
        }
    }

    h.viewport.send_replace(Size::new(400.0, 400.0));
    h.send(StageCommand::ViewportResized).await;

    let manager = h.finish().await;
    let a = manager.placement(manager.instance_for(&"a".into()).unwrap()).unwrap();
    let b = manager.placement(manager.instance_for(&"b".into()).unwrap()).unwrap();
    assert_eq!((a.width, a.height, a.left, a.top), (1600.0, 400.0, -600.0, 0.0));
    assert_eq!((b.width, b.height, b.left, b.top), (400.0, 800.0, 0.0, -200.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn destroying_last_wallpaper_releases_viewport() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::start(dir.path(), Size::new(100.0, 100.0), true);

    h.send(attach("a", OptionOverrides::default())).await;
    h.send(attach("b", OptionOverrides::default())).await;
    h.send(StageCommand::Destroy("a".into())).await;
    h.wait_for(|e| *e == WallpaperEvent::Ready).await;
    h.wait_for(|e| *e == WallpaperEvent::Ready).await;

    let manager = h.finish().await;
    assert!(manager.surface().viewport_observed());
    assert!(!manager.surface().is_mounted(&"a".into()));
    assert!(manager.surface().is_mounted(&"b".into()));
    assert_eq!(manager.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let h = Harness::start(dir.path(), Size::new(100.0, 100.0), true);
    h.send(attach("only", OptionOverrides::default())).await;
    h.send(StageCommand::Destroy("only".into())).await;
    let manager = h.finish().await;
    assert!(!manager.surface().viewport_observed());
    assert!(manager.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn playback_and_destroy_commands_keep_stage_running() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "a.png", 4, 3);
    let mut h = Harness::start(dir.path(), Size::new(100.0, 100.0), true);

    h.send(attach("hero", OptionOverrides::with_source("a.png"))).await;
    h.wait_for(|e| matches!(e, WallpaperEvent::Loaded(_))).await;
    h.send(StageCommand::Play("hero".into())).await;
    h.send(StageCommand::Stop("hero".into())).await;
    h.send(StageCommand::Play("ghost".into())).await;
    h.send(StageCommand::Destroy("hero".into())).await;
    h.send(StageCommand::Destroy("hero".into())).await;

    h.send(attach("hero", OptionOverrides::with_source("a.png"))).await;
    let loaded = h
        .wait_for(|e| matches!(e, WallpaperEvent::Loaded(_)))
        .await;
    assert_eq!(loaded.event, WallpaperEvent::Loaded("a.png".into()));

    let manager = h.finish().await;
    assert_eq!(manager.len(), 1);
}
