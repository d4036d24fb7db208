//! Shared test doubles for manager tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetcher::{FetchOptions, HookAction, MediaFetcher, MediaMetadata, RawProgress};

/// How a [`MockFetcher`] behaves once `download` is called
#[derive(Clone)]
pub(crate) enum MockBehavior {
    /// Emit `frames` progress hooks (the last one `finished`) and succeed
    Succeed { frames: usize },
    /// Emit progress hooks every few milliseconds until the hook aborts
    RunUntilAborted,
    /// Emit one progress hook, then fail with the given message
    Fail { message: String },
}

/// Scripted fetch boundary for exercising the manager without any subprocess
pub(crate) struct MockFetcher {
    pub(crate) title: String,
    pub(crate) behavior: MockBehavior,
}

impl MockFetcher {
    pub(crate) fn new(title: &str, behavior: MockBehavior) -> Self {
        Self {
            title: title.to_string(),
            behavior,
        }
    }

    fn frame(&self, index: usize, finished: bool) -> RawProgress {
        RawProgress {
            status: if finished { "finished" } else { "downloading" }.to_string(),
            downloaded_bytes: Some((index as f64 + 1.0) * 100.0),
            total_bytes: Some(1000.0),
            ..RawProgress::default()
        }
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch_metadata(&self, _url: &str) -> Result<MediaMetadata> {
        Ok(MediaMetadata {
            title: self.title.clone(),
            duration: Some(60.0),
            ext: Some("mp4".to_string()),
            filesize: Some(1000),
            filesize_approx: None,
            thumbnail: None,
            uploader: None,
            upload_date: None,
            view_count: None,
        })
    }

    async fn download(
        &self,
        _url: &str,
        _options: &FetchOptions,
        hook: &(dyn Fn(RawProgress) -> HookAction + Send + Sync),
    ) -> Result<()> {
        match &self.behavior {
            MockBehavior::Succeed { frames } => {
                for index in 0..*frames {
                    let finished = index + 1 == *frames;
                    if hook(self.frame(index, finished)) == HookAction::Abort {
                        return Err(Error::Aborted);
                    }
                }
                Ok(())
            }
            MockBehavior::RunUntilAborted => {
                let mut index = 0;
                loop {
                    if hook(self.frame(index, false)) == HookAction::Abort {
                        return Err(Error::Aborted);
                    }
                    index += 1;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
            MockBehavior::Fail { message } => {
                hook(self.frame(0, false));
                Err(Error::ExternalTool(message.clone()))
            }
        }
    }
}
