//! One end-to-end download attempt for a single URL.
//!
//! A [`DownloadTask`] wraps one invocation of the external fetch boundary:
//! it validates the URL, queries metadata, resolves a collision-free output
//! filename, translates raw progress dictionaries into normalized
//! [`ProgressEvent`] records, and cleans up partial artifacts when the run
//! is aborted by cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::{FetchOptions, HookAction, MediaFetcher, PARTIAL_SUFFIX, RawProgress};
use crate::filename;
use crate::types::{DownloadRequest, DownloadResult, FormatMode, ProgressEvent, ProgressStatus, Quality};

/// Fallback title when the metadata query returns an empty one
const FALLBACK_TITLE: &str = "video";

// Path-and-query patterns for recognized youtube.com links: watch, shorts,
// playlist. Video identifiers are exactly 11 characters.
#[allow(clippy::expect_used)]
static VIDEO_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/(?:watch\?(?:[^#]*&)?v=[A-Za-z0-9_-]{11}(?:&[^#]*)?|shorts/[A-Za-z0-9_-]{11}(?:\?[^#]*)?|playlist\?(?:[^#]*&)?list=[A-Za-z0-9_-]+(?:&[^#]*)?)$",
    )
    .expect("video path pattern is valid")
});

// Short-link pattern for youtu.be: the path is the video identifier.
#[allow(clippy::expect_used)]
static SHORT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[A-Za-z0-9_-]{11}(?:\?[^#]*)?$").expect("short link pattern is valid")
});

/// Check whether `raw` is a recognized video, shorts, or playlist link
pub fn is_supported_url(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);

    let target = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };

    match host {
        "youtube.com" => VIDEO_PATH.is_match(&target),
        "youtu.be" => SHORT_LINK.is_match(&target),
        _ => false,
    }
}

/// One download attempt: output directory, format selection, fetch boundary
pub struct DownloadTask {
    output_dir: PathBuf,
    format_mode: FormatMode,
    quality: Quality,
    fetcher: Arc<dyn MediaFetcher>,
}

impl DownloadTask {
    /// Create a task writing into `output_dir` with the given format selection
    pub fn new(
        output_dir: impl Into<PathBuf>,
        format_mode: FormatMode,
        quality: Quality,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            format_mode,
            quality,
            fetcher,
        }
    }

    /// Create a task from a request's output directory and format selection
    pub fn from_request(request: &DownloadRequest, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self::new(
            request.output_dir.clone(),
            request.format_mode,
            request.quality,
            fetcher,
        )
    }

    /// External format selector for this task's mode and quality
    pub fn format_selector(&self) -> &'static str {
        match (self.format_mode, self.quality) {
            (FormatMode::AudioOnly, _) => "bestaudio",
            (FormatMode::VideoOnly, Quality::Low) => "bestvideo[height<=480]",
            (FormatMode::VideoOnly, Quality::Medium) => "bestvideo[height<=720]",
            (FormatMode::VideoOnly, Quality::High) => "bestvideo",
            (FormatMode::VideoAndAudio, Quality::Low) => {
                "bestvideo[height<=480]+bestaudio/best[height<=480]"
            }
            (FormatMode::VideoAndAudio, Quality::Medium) => {
                "bestvideo[height<=720]+bestaudio/best[height<=720]"
            }
            (FormatMode::VideoAndAudio, Quality::High) => "bestvideo+bestaudio/best",
        }
    }

    /// Target container extension for this task's format mode
    fn container_ext(&self) -> &'static str {
        match self.format_mode {
            FormatMode::AudioOnly => "m4a",
            FormatMode::VideoOnly | FormatMode::VideoAndAudio => "mp4",
        }
    }

    /// Execute the download to completion.
    ///
    /// `cancel` is observed cooperatively at every progress-hook invocation;
    /// when it fires the external transfer loop is unwound, partial artifacts
    /// are deleted, and the run fails with [`Error::Aborted`]. `on_progress`
    /// must be non-blocking and safe to call from the worker context.
    pub async fn run(
        &self,
        url: &str,
        cancel: CancellationToken,
        on_progress: impl Fn(ProgressEvent) + Send + Sync,
    ) -> Result<DownloadResult> {
        if !is_supported_url(url) {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        // Metadata only, no media bytes yet
        let metadata = self.fetcher.fetch_metadata(url).await?;

        let mut title = filename::sanitize(&metadata.title);
        if title.is_empty() {
            title = FALLBACK_TITLE.to_string();
        }

        let desired = format!("{}.{}", title, self.container_ext());
        let final_name = filename::resolve_unique(&self.output_dir, &desired);
        let stem = Path::new(&final_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&final_name)
            .to_string();

        tracing::info!(url = %url, filename = %final_name, "Starting download");

        // The exact resolved name is bound end to end: the probed name, the
        // path the fetcher writes, and the filename the completion event
        // reports are all the same string.
        let options = FetchOptions {
            format_selector: self.format_selector().to_string(),
            output_path: self.output_dir.join(&final_name),
            no_overwrite: true,
            audio_format: match self.format_mode {
                FormatMode::AudioOnly => Some(self.container_ext().to_string()),
                _ => None,
            },
            merge_container: match self.format_mode {
                FormatMode::VideoAndAudio => Some(self.container_ext().to_string()),
                _ => None,
            },
        };

        let hook = |raw: RawProgress| -> HookAction {
            if cancel.is_cancelled() {
                return HookAction::Abort;
            }
            on_progress(normalize_progress(&raw));
            HookAction::Continue
        };

        match self.fetcher.download(url, &options, &hook).await {
            Ok(()) => {
                tracing::info!(url = %url, filename = %final_name, "Download complete");
                let filesize_bytes = metadata.best_filesize();
                Ok(DownloadResult {
                    path: self.output_dir.join(&final_name),
                    filename: final_name,
                    title: metadata.title,
                    duration_seconds: metadata.duration,
                    filesize_bytes,
                    format: self.format_selector().to_string(),
                })
            }
            Err(Error::Aborted) => {
                self.cleanup_partials(&stem).await;
                Err(Error::Aborted)
            }
            Err(error) => Err(error),
        }
    }

    /// Delete partial artifacts left behind by an interrupted transfer.
    ///
    /// Scans the output directory for entries that start with the resolved
    /// stem and end with the external library's partial-file suffix. Deletion
    /// errors are logged, never propagated.
    async fn cleanup_partials(&self, stem: &str) {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    dir = %self.output_dir.display(),
                    error = %error,
                    "Could not scan output directory for partial files"
                );
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(stem) || !name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::info!(file = %name, "Removed partial download artifact");
                }
                Err(error) => {
                    tracing::warn!(
                        file = %name,
                        error = %error,
                        "Failed to remove partial download artifact"
                    );
                }
            }
        }
    }
}

/// Translate a raw progress dictionary into a normalized [`ProgressEvent`].
///
/// The percentage is always derived here: `downloaded / total * 100` using
/// the exact total when known and positive, falling back to the estimate,
/// and reporting 0 when neither is usable.
fn normalize_progress(raw: &RawProgress) -> ProgressEvent {
    let total = raw.total_bytes.filter(|t| *t > 0.0);
    let estimate = raw.total_bytes_estimate.filter(|t| *t > 0.0);
    let known_total = total.or(estimate);

    let downloaded = raw.downloaded_bytes.unwrap_or(0.0).max(0.0);
    let percent = known_total
        .map(|t| ((downloaded / t) * 100.0).clamp(0.0, 100.0) as f32)
        .unwrap_or(0.0);

    ProgressEvent {
        status: match raw.status.as_str() {
            "finished" => ProgressStatus::Finished,
            "downloading" => ProgressStatus::Downloading,
            _ => ProgressStatus::Starting,
        },
        filename: raw.filename.clone(),
        elapsed_seconds: raw.elapsed.unwrap_or(0.0),
        total_bytes: known_total.map(|t| t as u64),
        downloaded_bytes: downloaded as u64,
        speed_bps: raw.speed,
        eta_seconds: raw.eta.filter(|e| *e >= 0.0).map(|e| e as u64),
        percent,
    }
}
