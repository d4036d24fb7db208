//! Configuration types for tube-dl

use crate::types::{DownloadRequest, FormatMode, Quality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Download behavior configuration (output directory, format defaults, polling)
///
/// Groups settings related to how downloads are stored and reported.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default format mode for new requests
    #[serde(default)]
    pub format_mode: FormatMode,

    /// Default quality cap for new requests
    #[serde(default)]
    pub quality: Quality,

    /// Recommended consumer drain cadence in milliseconds (default: 100)
    ///
    /// The library does not poll on its own; this is the interval at which
    /// the embedding UI is expected to call [`crate::DownloadManager::drain`].
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format_mode: FormatMode::default(),
            quality: Quality::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// External tool configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for the executable if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for the download manager
///
/// Sub-config fields are flattened for serialization, so the JSON format
/// stays flat (no nesting).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Build a [`DownloadRequest`] for `url` using this configuration's defaults
    pub fn request_for(&self, url: impl Into<String>) -> DownloadRequest {
        DownloadRequest {
            url: url.into(),
            output_dir: self.download.output_dir.clone(),
            format_mode: self.download.format_mode,
            quality: self.download.quality,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}
