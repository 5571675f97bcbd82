use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::processing::layout::Size;
use crate::source::MediaSource;

/// Resolved per-instance options.
#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperOptions {
    /// Start video playback as soon as a swap completes.
    pub auto_play: bool,
    /// Play video only while the pointer is over the target. Wins over `auto_play`.
    pub hover_play: bool,
    /// Native loop attribute for video.
    pub looping: bool,
    /// Cross-fade duration.
    pub speed: Duration,
    /// Fail a load that has not reported back within this long.
    pub load_timeout: Option<Duration>,
    /// Media loaded right after attach.
    pub source: Option<MediaSource>,
}

impl WallpaperOptions {
    pub const DEFAULT_SPEED: Duration = Duration::from_millis(500);
    pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

    /// Layers `overrides` on top of these options.
    pub fn merged(&self, overrides: &OptionOverrides) -> Self {
        Self {
            auto_play: overrides.auto_play.unwrap_or(self.auto_play),
            hover_play: overrides.hover_play.unwrap_or(self.hover_play),
            looping: overrides.looping.unwrap_or(self.looping),
            speed: overrides.speed.unwrap_or(self.speed),
            load_timeout: overrides.load_timeout.or(self.load_timeout),
            source: overrides.source.clone().or_else(|| self.source.clone()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.load_timeout {
            ensure!(!timeout.is_zero(), "load-timeout must be positive");
        }
        if let Some(MediaSource::Video(video)) = &self.source {
            ensure!(
                !video.is_empty(),
                "video source must list at least one of webm, mp4, ogg"
            );
        }
        Ok(())
    }
}

impl Default for WallpaperOptions {
    fn default() -> Self {
        Self {
            auto_play: true,
            hover_play: false,
            looping: true,
            speed: Self::DEFAULT_SPEED,
            load_timeout: Some(Self::DEFAULT_LOAD_TIMEOUT),
            source: None,
        }
    }
}

/// Partial options as written in config files or passed to `attach`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OptionOverrides {
    pub auto_play: Option<bool>,
    pub hover_play: Option<bool>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    #[serde(with = "humantime_serde")]
    pub speed: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub load_timeout: Option<Duration>,
    pub source: Option<MediaSource>,
}

impl OptionOverrides {
    pub fn with_source(source: impl Into<MediaSource>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
}

impl FrameConfig {
    pub fn size(&self) -> Size {
        Size::from((self.width, self.height))
    }
}

impl FromStr for FrameConfig {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid dimension {v:?}: {err}"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Viewport size every target is laid out at by the headless stage.
    pub frame: FrameConfig,
    /// Directory relative image sources are resolved against.
    pub media_root: PathBuf,
    /// Options shared by every wallpaper unless overridden per target.
    pub defaults: OptionOverrides,
    /// Wallpapers keyed by target name.
    pub wallpapers: BTreeMap<String, OptionOverrides>,
    /// Maximum number of concurrent dimension probes in the loader.
    pub loader_max_concurrent_probes: usize,
    /// How often the stage checks for timed-out loads.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Resolved defaults: built-in options with the `defaults` block applied.
    pub fn default_options(&self) -> WallpaperOptions {
        WallpaperOptions::default().merged(&self.defaults)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.frame.width > 0 && self.frame.height > 0,
            "frame must have a non-zero width and height"
        );
        ensure!(
            self.loader_max_concurrent_probes > 0,
            "loader-max-concurrent-probes must be greater than zero"
        );
        ensure!(
            !self.tick_interval.is_zero(),
            "tick-interval must be greater than zero"
        );
        let defaults = self.default_options();
        defaults.validate().context("invalid defaults")?;
        for (target, overrides) in &self.wallpapers {
            ensure!(!target.trim().is_empty(), "wallpaper target names must not be empty");
            defaults
                .merged(overrides)
                .validate()
                .with_context(|| format!("invalid wallpaper {target}"))?;
        }
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            media_root: PathBuf::from("."),
            defaults: OptionOverrides::default(),
            wallpapers: BTreeMap::new(),
            loader_max_concurrent_probes: 4,
            tick_interval: Duration::from_millis(100),
        }
    }
}
