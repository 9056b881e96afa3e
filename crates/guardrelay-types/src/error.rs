//! Error types for guardrelay.
//!
//! [`RelayError`] is the top-level error returned by the relay loop and the
//! loaders around it. [`MailboxError`] is what a mailbox implementation
//! reports across the `Mailbox` trait in `guardrelay-core`.

use thiserror::Error;

/// Top-level error type for guardrelay.
///
/// Every variant is fatal for the current run. The only recoverable
/// condition (SteamCMD asking for a Steam Guard code) is not an error; it is
/// handled inside the relay loop.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// `config.json` is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// SteamCMD could not be spawned or its output could not be captured.
    #[error("failed to run {program}: {reason}")]
    Process {
        /// Executable that was being run.
        program: String,
        /// Underlying failure.
        reason: String,
    },

    /// OAuth2 consent, token exchange or token refresh failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The mailbox could not be queried.
    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a mailbox implementation.
///
/// A mailbox that simply has no matching message returns `Ok(None)`; these
/// variants are reserved for conditions that abort the run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MailboxError {
    /// The credential could not be obtained or refreshed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Listing or fetching messages failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A message body could not be decoded.
    #[error("malformed message {message_id}: {reason}")]
    Malformed {
        /// Provider message id.
        message_id: String,
        /// What could not be decoded.
        reason: String,
    },
}

/// A convenience alias used throughout guardrelay.
pub type Result<T> = std::result::Result<T, RelayError>;
