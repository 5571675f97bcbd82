use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::select;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::StageCommand;
use crate::processing::layout::Size;
use crate::source::MediaSource;
use crate::surface::{MediaId, TargetId};

/// One element waiting for its natural dimensions.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: TargetId,
    pub media: MediaId,
    pub source: MediaSource,
}

/// Maps an image URL onto a local file under `root`. Only plain paths and
/// `file://` URLs are local.
pub fn resolve_image_path(root: &Path, url: &str) -> Option<PathBuf> {
    let path = match url.split_once("://") {
        Some(("file", rest)) => rest,
        Some(_) => return None,
        None => url,
    };
    let path = Path::new(path);
    Some(if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    })
}

/// Reads natural dimensions from the image header without decoding pixels.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let dims = image::ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()?
        .into_dimensions()
        .with_context(|| format!("reading dimensions of {}", path.display()))?;
    Ok(dims)
}

fn probe_source(root: &Path, source: &MediaSource) -> Result<(u32, u32)> {
    match source {
        MediaSource::Image(url) => match resolve_image_path(root, url) {
            Some(path) => probe_dimensions(&path),
            None => bail!("{url} is not a local file"),
        },
        MediaSource::Video(_) => bail!("video metadata is not available without a media element"),
    }
}

/// Probes requested media off-thread and reports back to the stage.
///
/// At most `max_in_flight` probes run at once; further requests wait in the
/// channel. Exits when cancelled, or once the request channel has closed and
/// every running probe has reported.
pub async fn run(
    mut requests: UnboundedReceiver<ProbeRequest>,
    to_stage: Sender<StageCommand>,
    media_root: PathBuf,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let mut tasks: JoinSet<(ProbeRequest, Result<(u32, u32)>)> = JoinSet::new();
    let mut closed = false;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_req = requests.recv(), if !closed && tasks.len() < max_in_flight => {
                match maybe_req {
                    Some(req) => {
                        let root = media_root.clone();
                        tasks.spawn(async move {
                            let source = req.source.clone();
                            let res = tokio::task::spawn_blocking(move || probe_source(&root, &source))
                                .await
                                .context("probe task panicked")
                                .and_then(|r| r);
                            (req, res)
                        });
                    }
                    None => {
                        closed = true;
                        if tasks.is_empty() {
                            break;
                        }
                    }
                }
            }

            Some(joined) = tasks.join_next() => {
                let Ok((req, res)) = joined else {
                    continue;
                };
                let cmd = match res {
                    Ok(dims) => {
                        debug!(wallpaper = %req.target, media = %req.media, ?dims, "probed");
                        StageCommand::MediaReady {
                            target: req.target,
                            media: req.media,
                            natural: Size::from(dims),
                        }
                    }
                    Err(err) => {
                        debug!(wallpaper = %req.target, media = %req.media, "probe failed: {err:#}");
                        StageCommand::MediaFailed {
                            target: req.target,
                            media: req.media,
                            reason: format!("{err:#}"),
                        }
                    }
                };
                if to_stage.send(cmd).await.is_err() {
                    break;
                }
                if closed && tasks.is_empty() {
                    break;
                }
            }
        }
    }
    Ok(())
}
