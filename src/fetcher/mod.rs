//! Boundary to the external media-download library.
//!
//! The core never talks to the network itself. It hands a URL and a
//! [`FetchOptions`] set to a [`MediaFetcher`] implementation and receives
//! metadata dictionaries and a stream of raw progress dictionaries back.
//! Cancellation crosses this boundary as an explicit [`HookAction::Abort`]
//! return value from the progress hook, which the implementation must honor
//! by unwinding its transfer loop with [`crate::Error::Aborted`].

mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::Result;

/// Suffix the external library appends to incompletely written output files
pub const PARTIAL_SUFFIX: &str = ".part";

/// Option set supplied to the external library for one download
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Format selector string (e.g. `bestaudio`, `bestvideo[height<=720]+bestaudio`)
    pub format_selector: String,

    /// Exact path the finished file must be written to, no template
    /// placeholders. The file on disk carries precisely this name, so it
    /// always matches the name reported in the completion event.
    pub output_path: PathBuf,

    /// Refuse to overwrite existing files
    pub no_overwrite: bool,

    /// Audio container to extract/convert to, for audio-only downloads
    pub audio_format: Option<String>,

    /// Container to merge separate video/audio streams into, when applicable
    pub merge_container: Option<String>,
}

/// Control-flow signal returned by the progress hook
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookAction {
    /// Keep transferring
    Continue,
    /// Unwind the transfer loop and fail with [`crate::Error::Aborted`]
    Abort,
}

/// Raw progress dictionary as emitted by the external library.
///
/// All numeric fields are `f64` because the library reports a mix of integers
/// and floats; unknown fields are ignored, missing fields default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawProgress {
    /// Raw status string (`downloading`, `finished`, ...)
    pub status: String,

    /// Seconds elapsed since the transfer started
    pub elapsed: Option<f64>,

    /// Exact total size in bytes, when the server reports one
    pub total_bytes: Option<f64>,

    /// Estimated total size in bytes, when only an estimate is available
    pub total_bytes_estimate: Option<f64>,

    /// Bytes transferred so far
    pub downloaded_bytes: Option<f64>,

    /// Current transfer speed in bytes per second
    pub speed: Option<f64>,

    /// Estimated seconds to completion
    pub eta: Option<f64>,

    /// File currently being written
    pub filename: Option<String>,
}

/// Metadata dictionary returned by the external library's info query
#[derive(Clone, Debug, Deserialize)]
pub struct MediaMetadata {
    /// Video title
    pub title: String,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Provisional container extension of the best format
    #[serde(default)]
    pub ext: Option<String>,

    /// Exact file size in bytes, when known
    #[serde(default)]
    pub filesize: Option<u64>,

    /// Approximate file size in bytes, when only an estimate is available
    #[serde(default)]
    pub filesize_approx: Option<u64>,

    /// Thumbnail URL, for the embedding UI to fetch and render
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Uploader / channel name
    #[serde(default)]
    pub uploader: Option<String>,

    /// Upload date in the library's `YYYYMMDD` form
    #[serde(default)]
    pub upload_date: Option<String>,

    /// View count at query time
    #[serde(default)]
    pub view_count: Option<u64>,
}

impl MediaMetadata {
    /// Best available file size: exact when known, else the estimate
    pub fn best_filesize(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Opaque media retrieval operation.
///
/// Trait object so the download task can be exercised against scripted
/// implementations in tests while production code uses [`YtDlpFetcher`].
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Query metadata for `url` without fetching any media bytes.
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata>;

    /// Download `url` with the given options, invoking `hook` zero or more
    /// times with raw progress dictionaries. The finished file must land at
    /// exactly `options.output_path`.
    ///
    /// When `hook` returns [`HookAction::Abort`] the implementation must stop
    /// the transfer and return [`crate::Error::Aborted`]. Partial output files
    /// carrying [`PARTIAL_SUFFIX`] may be left behind; cleaning them up is the
    /// caller's job.
    async fn download(
        &self,
        url: &str,
        options: &FetchOptions,
        hook: &(dyn Fn(RawProgress) -> HookAction + Send + Sync),
    ) -> Result<()>;
}
