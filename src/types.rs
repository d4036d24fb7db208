//! Core types for tube-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User-selected output mode for a download
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    /// Best available audio stream only
    AudioOnly,
    /// Best available video stream only (no audio track)
    VideoOnly,
    /// Video and audio, merged into one container
    #[default]
    VideoAndAudio,
}

/// Quality cap for video streams
///
/// Ignored for [`FormatMode::AudioOnly`], which always selects the best
/// audio stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Capped at 480p
    Low,
    /// Capped at 720p
    Medium,
    /// Uncapped
    #[default]
    High,
}

/// One download request, immutable once its task starts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Video, shorts, or playlist URL; also the request identifier
    pub url: String,

    /// Directory the finished file is written to
    pub output_dir: PathBuf,

    /// Output mode
    #[serde(default)]
    pub format_mode: FormatMode,

    /// Video quality cap
    #[serde(default)]
    pub quality: Quality,
}

impl DownloadRequest {
    /// Create a request with default format mode and quality
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            format_mode: FormatMode::default(),
            quality: Quality::default(),
        }
    }
}

/// Lifecycle phase reported by a progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Transfer not started yet (or raw status unrecognized)
    Starting,
    /// Bytes are being transferred
    Downloading,
    /// Transfer of the current stream finished
    Finished,
}

/// Normalized progress record for one task
///
/// Produced repeatedly during a task's lifetime. `percent` is always derived
/// from the byte counters, never taken from the external library directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Lifecycle phase
    pub status: ProgressStatus,

    /// Filename currently being written, when the library reports one
    pub filename: Option<String>,

    /// Seconds elapsed since the transfer started
    pub elapsed_seconds: f64,

    /// Total size in bytes (exact when known, else the library's estimate)
    pub total_bytes: Option<u64>,

    /// Bytes downloaded so far
    pub downloaded_bytes: u64,

    /// Current speed in bytes per second
    pub speed_bps: Option<f64>,

    /// Estimated seconds to completion
    pub eta_seconds: Option<u64>,

    /// Derived progress percentage, always in `[0.0, 100.0]`
    pub percent: f32,
}

/// Result record for one successfully completed download
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Final filename within the output directory
    pub filename: String,

    /// Full path of the finished file
    pub path: PathBuf,

    /// Video title as reported by the metadata query
    pub title: String,

    /// Duration in seconds, when known
    pub duration_seconds: Option<f64>,

    /// File size in bytes, when the metadata query reported one
    pub filesize_bytes: Option<u64>,

    /// The external format selector the download was performed with
    pub format: String,
}

/// Event emitted by a download worker onto the manager's channel
///
/// Every variant carries the request identifier (the URL) so the consumer
/// can route it to the right row of its display.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Progress update
    Progress {
        /// Request identifier
        id: String,
        /// Normalized progress record
        progress: ProgressEvent,
    },

    /// Task finished successfully
    Complete {
        /// Request identifier
        id: String,
        /// Result record
        result: DownloadResult,
    },

    /// Task failed with a non-cancellation error
    Failed {
        /// Request identifier
        id: String,
        /// Error message, surfaced verbatim to the consumer
        error: String,
    },

    /// Task was cancelled and its partial artifacts cleaned up
    Cancelled {
        /// Request identifier
        id: String,
    },
}
