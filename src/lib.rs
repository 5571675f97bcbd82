pub mod config;
pub mod error;
pub mod events;
pub mod headless;
pub mod manager;
pub mod processing {
    pub mod layout;
}
pub mod source;
pub mod surface;
pub mod swap;
pub mod tasks {
    pub mod loader;
    pub mod stage;
}

pub use error::{Error, Result};
pub use manager::WallpaperManager;
pub use processing::layout::{Placement, Size, cover};
pub use source::{MediaSource, VideoSources};
pub use swap::{LoadOutcome, MediaSwapController, SwapState};
