//! yt-dlp subprocess implementation of the fetch boundary.
//!
//! Metadata comes from `--dump-single-json --skip-download`; downloads run
//! with `--newline --progress-template "%(progress)j"` so every progress
//! update arrives as one JSON dictionary per stdout line. The output path is
//! passed literally (no `%(ext)s` placeholder), so the finished file lands
//! at exactly the name the caller resolved.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::config::ToolsConfig;
use crate::error::{Error, Result};

use super::{FetchOptions, HookAction, MediaFetcher, MediaMetadata, RawProgress};

/// Name of the yt-dlp executable searched on PATH
const YTDLP_BINARY: &str = "yt-dlp";

/// Progress template that makes yt-dlp print its progress dict as JSON
const PROGRESS_TEMPLATE: &str = "%(progress)j";

/// [`MediaFetcher`] backed by the `yt-dlp` executable
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    /// Create a fetcher driving the executable at `binary`
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve the executable from configuration.
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled.
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        if let Some(path) = &tools.ytdlp_path {
            return Ok(Self::new(path.clone()));
        }
        if tools.search_path
            && let Ok(found) = which::which(YTDLP_BINARY)
        {
            tracing::debug!(binary = %found.display(), "Found yt-dlp on PATH");
            return Ok(Self::new(found));
        }
        Err(Error::ExternalTool(
            "yt-dlp not found: set ytdlp_path or install it on PATH".to_string(),
        ))
    }

    /// Path of the executable this fetcher drives
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata> {
        let output = Command::new(&self.binary)
            .args(["--dump-single-json", "--skip-download", "--no-warnings", "--"])
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::ExternalTool(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Metadata(first_error_line(&stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Metadata(format!("unparseable metadata: {}", e)))
    }

    async fn download(
        &self,
        url: &str,
        options: &FetchOptions,
        hook: &(dyn Fn(RawProgress) -> HookAction + Send + Sync),
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-f")
            .arg(&options.format_selector)
            .arg("-o")
            .arg(&options.output_path)
            .arg("--newline")
            .arg("--progress-template")
            .arg(PROGRESS_TEMPLATE)
            .arg("--no-warnings");
        if options.no_overwrite {
            cmd.arg("--no-overwrites");
        }
        if let Some(format) = &options.audio_format {
            cmd.arg("--extract-audio").arg("--audio-format").arg(format);
        }
        if let Some(container) = &options.merge_container {
            cmd.arg("--merge-output-format").arg(container);
        }
        cmd.arg("--").arg(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            Error::ExternalTool(format!("failed to run {}: {}", self.binary.display(), e))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stdout unavailable".to_string()))?;

        // Slurp stderr concurrently so a chatty child can never fill the pipe
        // and stall while we are blocked on stdout.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_string(&mut buf).await.ok();
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut aborted = false;
        while let Some(line) = lines.next_line().await? {
            let Some(raw) = parse_progress_line(&line) else {
                continue;
            };
            if hook(raw) == HookAction::Abort {
                aborted = true;
                break;
            }
        }

        if aborted {
            tracing::debug!(url = %url, "Abort requested, killing yt-dlp");
            child.kill().await.ok();
            child.wait().await.ok();
            stderr_task.abort();
            return Err(Error::Aborted);
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(Error::ExternalTool(first_error_line(&stderr_text)));
        }
        Ok(())
    }
}

/// Parse one stdout line into a raw progress dictionary.
///
/// Non-JSON lines (`[download] Destination: ...` and friends) are skipped.
fn parse_progress_line(line: &str) -> Option<RawProgress> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Pull the most useful single line out of captured stderr.
///
/// yt-dlp prefixes fatal messages with `ERROR:`; fall back to the first
/// non-empty line, then to a generic message.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("external tool exited with failure status")
        .to_string()
}
