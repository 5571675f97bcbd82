//! Headless wallpaper stage: attaches every configured wallpaper, probes
//! image dimensions from disk, and prints the resulting cover geometry.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use serde::Serialize;
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use wallpaper::config::{Configuration, FrameConfig};
use wallpaper::events::{Notification, StageCommand, WallpaperEvent};
use wallpaper::headless::ProbeSurface;
use wallpaper::surface::TargetId;
use wallpaper::tasks::{loader, stage};
use wallpaper::{Placement, WallpaperManager, cover};

#[derive(Debug, Parser)]
#[command(
    name = "wallpaper",
    version,
    about = "Cover-fit background media without a display"
)]
struct Args {
    /// Path to YAML stage config
    #[arg(value_name = "CONFIG", required_unless_present = "fit")]
    config: Option<PathBuf>,
    /// Override the configured frame, e.g. 1280x720
    #[arg(long, value_name = "WxH")]
    frame: Option<FrameConfig>,
    /// Resize the viewport after the initial loads settle (repeatable)
    #[arg(long = "resize", value_name = "WxH")]
    resizes: Vec<FrameConfig>,
    /// Print the cover placement for FRAME:MEDIA (e.g. 800x600:1600x400) and exit
    #[arg(long, value_name = "FRAME:MEDIA")]
    fit: Option<String>,
    /// Emit placements as JSON
    #[arg(long)]
    json: bool,
    /// Stop waiting for initial loads after this long
    #[arg(long, value_name = "DURATION", default_value = "10s", value_parser = humantime::parse_duration)]
    settle_timeout: Duration,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Serialize)]
struct PlacementRow {
    target: TargetId,
    source: Option<String>,
    placement: Option<Placement>,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(format!("wallpaper={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    if let Some(fit) = args.fit.as_deref() {
        return print_fit(fit, args.json);
    }

    let config = args
        .config
        .as_ref()
        .ok_or_else(|| anyhow!("a CONFIG path is required"))?;
    let mut cfg = Configuration::from_yaml_file(config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if let Some(frame) = args.frame {
        cfg.frame = frame;
    }
    if cfg.media_root.is_relative() {
        if let Some(dir) = config.parent() {
            cfg.media_root = dir.join(&cfg.media_root);
        }
    }
    info!(
        wallpapers = cfg.wallpapers.len(),
        frame = ?cfg.frame,
        "loaded configuration from {}",
        config.display()
    );

    let rows = run_stage(&cfg, &args.resizes, args.settle_timeout).await?;
    print_rows(&rows, args.json)
}

fn print_fit(fit: &str, json: bool) -> Result<()> {
    let (frame, media) = fit
        .split_once(':')
        .ok_or_else(|| anyhow!("expected FRAME:MEDIA, got {fit:?}"))?;
    let frame: FrameConfig = frame.parse().map_err(|e: String| anyhow!(e))?;
    let media: FrameConfig = media.parse().map_err(|e: String| anyhow!(e))?;
    let placement = cover(frame.size(), media.size())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&placement)?);
    } else {
        println!(
            "{}x{} at ({}, {})",
            placement.width, placement.height, placement.left, placement.top
        );
    }
    Ok(())
}

fn print_rows(rows: &[PlacementRow], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    for row in rows {
        let source = row.source.as_deref().unwrap_or("(nothing loaded)");
        match row.placement {
            Some(p) => println!(
                "{}: {:.1}x{:.1} at ({:.1}, {:.1})  {}",
                row.target, p.width, p.height, p.left, p.top, source
            ),
            None => println!("{}: no geometry  {}", row.target, source),
        }
    }
    Ok(())
}

async fn run_stage(
    cfg: &Configuration,
    resizes: &[FrameConfig],
    settle_timeout: Duration,
) -> Result<Vec<PlacementRow>> {
    let (viewport_tx, viewport_rx) = watch::channel(cfg.frame.size());
    let (probe_tx, probe_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::channel::<StageCommand>(64); // callers + host callbacks -> stage
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let surface = ProbeSurface::new(viewport_rx, probe_tx, cmd_tx.clone());
    let manager = WallpaperManager::new(surface, cfg.default_options(), notify_tx);

    let loader = tokio::spawn(loader::run(
        probe_rx,
        cmd_tx.clone(),
        cfg.media_root.clone(),
        cancel.clone(),
        cfg.loader_max_concurrent_probes,
    ));
    let stage = tokio::spawn(stage::run(manager, cmd_rx, cancel.clone(), cfg.tick_interval));

    let defaults = cfg.default_options();
    let mut pending = BTreeSet::new();
    for (name, overrides) in &cfg.wallpapers {
        let target = TargetId::new(name.as_str());
        if defaults.merged(overrides).source.is_some() {
            pending.insert(target.clone());
        }
        cmd_tx
            .send(StageCommand::Attach {
                target,
                overrides: overrides.clone(),
            })
            .await?;
    }
    wait_settled(&mut notify_rx, pending, settle_timeout).await;

    for size in resizes {
        info!(width = size.width, height = size.height, "resizing viewport");
        viewport_tx.send_replace(size.size());
        cmd_tx.send(StageCommand::ViewportResized).await?;
    }
    cmd_tx.send(StageCommand::Shutdown).await?;

    let mut manager = stage.await??;
    cancel.cancel();
    loader.await??;

    let rows = manager
        .iter()
        .map(|(_, c)| PlacementRow {
            target: c.target().clone(),
            source: c.displayed().map(ToString::to_string),
            placement: c.placement(),
        })
        .collect();
    manager.shutdown();
    Ok(rows)
}

/// Waits until every target in `pending` has loaded or failed.
async fn wait_settled(
    notifications: &mut UnboundedReceiver<Notification>,
    mut pending: BTreeSet<TargetId>,
    limit: Duration,
) {
    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);
    while !pending.is_empty() {
        select! {
            _ = &mut deadline => {
                warn!(?pending, "gave up waiting for initial loads");
                break;
            }
            maybe = notifications.recv() => {
                let Some(Notification { target, event, .. }) = maybe else {
                    break;
                };
                match event {
                    WallpaperEvent::Loaded(_) => {
                        pending.remove(&target);
                    }
                    WallpaperEvent::LoadFailed { source, reason } => {
                        warn!(wallpaper = %target, %source, "{reason}");
                        pending.remove(&target);
                    }
                    _ => {}
                }
            }
        }
    }
}
