use std::fmt;

use serde::{Deserialize, Serialize};

/// What a wallpaper displays: a single image URL or a set of video encodings.
///
/// Deserializes from a bare string (image) or from a `{webm, mp4, ogg}` map
/// (video), mirroring how sources are written in stage configs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaSource {
    Image(String),
    Video(VideoSources),
}

impl MediaSource {
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image(url.into())
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(url) => write!(f, "image {url}"),
            Self::Video(video) => {
                f.write_str("video [")?;
                for (idx, alt) in video.alternatives().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(alt.url)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for MediaSource {
    fn from(url: &str) -> Self {
        Self::Image(url.to_owned())
    }
}

impl From<VideoSources> for MediaSource {
    fn from(video: VideoSources) -> Self {
        Self::Video(video)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Alternative encodings of one video; the host picks the first it can play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoSources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogg: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoAlternative<'a> {
    pub url: &'a str,
    pub mime: &'static str,
}

impl VideoSources {
    /// Encodings in host preference order: webm, mp4, ogg.
    pub fn alternatives(&self) -> impl Iterator<Item = VideoAlternative<'_>> {
        [
            (self.webm.as_deref(), "video/webm"),
            (self.mp4.as_deref(), "video/mp4"),
            (self.ogg.as_deref(), "video/ogg"),
        ]
        .into_iter()
        .filter_map(|(url, mime)| url.map(|url| VideoAlternative { url, mime }))
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives().next().is_none()
    }
}
