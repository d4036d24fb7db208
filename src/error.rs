//! Error types for tube-dl
//!
//! This module provides the error taxonomy for the library:
//! - User-input errors (`InvalidUrl`) surfaced verbatim and never retried
//! - Environmental errors (`Metadata`, `Io`, `ExternalTool`) surfaced as error events
//! - `Aborted`, the expected outcome of cooperative cancellation
//! - Coordination errors (`DuplicateRequest`)

use thiserror::Error;

/// Result type alias for tube-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tube-dl
#[derive(Debug, Error)]
pub enum Error {
    /// The URL is not a recognized video, shorts, or playlist link.
    ///
    /// Raised before any I/O happens. The offending URL is carried verbatim
    /// so the consumer can show it to the user.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Metadata query failed before any media bytes were fetched
    #[error("metadata fetch failed: {0}")]
    Metadata(String),

    /// The external download tool failed or could not be launched
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Download aborted by cooperative cancellation
    ///
    /// This is an expected outcome, not a failure: the coordinator reports it
    /// through the `Cancelled` event channel tag rather than `Failed`.
    #[error("download aborted")]
    Aborted,

    /// A download for this request identifier is already active
    #[error("download already active for {0}")]
    DuplicateRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
