//! # tube-dl
//!
//! Backend library for desktop YouTube download applications.
//!
//! ## Design Philosophy
//!
//! tube-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Poll-friendly** - Workers push events onto one internally synchronized
//!   channel; a single-threaded UI drains it at its own cadence and is never
//!   blocked by a download
//! - **Cooperatively cancellable** - Downloads stop at their next progress
//!   callback and clean up their partial files
//!
//! The actual media retrieval is delegated to an external tool (yt-dlp)
//! behind the [`MediaFetcher`] trait; this crate owns the coordination:
//! filename resolution, progress normalization, worker lifecycle, and event
//! delivery.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tube_dl::{Config, DownloadManager};
//!
//! #[tokio::main]
//! async fn main() -> tube_dl::Result<()> {
//!     let config = Config::default();
//!     let manager = DownloadManager::from_config(&config)?;
//!
//!     let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
//!     manager.start(config.request_for(url))?;
//!
//!     // UI polling loop: drain the event channel on a fixed cadence
//!     let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
//!         config.download.poll_interval_ms,
//!     ));
//!     while manager.is_active(url) {
//!         ticker.tick().await;
//!         manager.drain(
//!             |url, progress| println!("{url}: {:.1}%", progress.percent),
//!             |url, result| println!("{url} -> {}", result.path.display()),
//!             |url, error| eprintln!("{url} failed: {error}"),
//!             |url| println!("{url} cancelled"),
//!         );
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Boundary to the external media-download library
pub mod fetcher;
/// Filesystem-safe, collision-free filename resolution
pub mod filename;
/// Download coordination and event delivery
pub mod manager;
/// Single download execution
pub mod task;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, ToolsConfig};
pub use error::{Error, Result};
pub use fetcher::{
    FetchOptions, HookAction, MediaFetcher, MediaMetadata, PARTIAL_SUFFIX, RawProgress,
    YtDlpFetcher,
};
pub use manager::DownloadManager;
pub use task::{DownloadTask, is_supported_url};
pub use types::{
    DownloadRequest, DownloadResult, FormatMode, ProgressEvent, ProgressStatus, Quality, TaskEvent,
};
