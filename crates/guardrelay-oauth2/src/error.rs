//! OAuth2 error type.

use thiserror::Error;

/// Failure while obtaining, refreshing or persisting a Google credential.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    /// `credentials.json` is missing or not an installed/web client secret.
    #[error("client credentials: {0}")]
    Credentials(String),

    /// The loopback callback listener could not be started.
    #[error("callback listener on {addr}: {reason}")]
    Listener {
        addr: String,
        reason: String,
    },

    /// No callback arrived before the consent deadline.
    #[error("no authorization callback within {0}s")]
    Timeout(u64),

    /// The user (or Google) refused consent.
    #[error("authorization denied: {0}")]
    Denied(String),

    /// The token endpoint rejected the exchange or refresh.
    #[error("token request failed: {0}")]
    TokenRequest(String),

    /// `token.json` could not be read or written.
    #[error("token store: {0}")]
    Store(String),
}

impl From<AuthError> for guardrelay_types::RelayError {
    fn from(err: AuthError) -> Self {
        guardrelay_types::RelayError::Auth(err.to_string())
    }
}

impl From<AuthError> for guardrelay_types::MailboxError {
    fn from(err: AuthError) -> Self {
        guardrelay_types::MailboxError::AuthFailed(err.to_string())
    }
}
