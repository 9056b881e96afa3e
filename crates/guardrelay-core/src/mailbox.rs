//! The inbox the relay polls for Steam Guard codes.

use async_trait::async_trait;
use guardrelay_types::MailboxError;

/// A source of Steam Guard codes.
///
/// `authenticate` is called once per guardrelay run, before SteamCMD is
/// started, and may block on interactive consent. `fetch_auth_code` is
/// called repeatedly while a run is blocked on Steam Guard.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Credential returned by [`authenticate`](Self::authenticate) and
    /// passed back on every fetch.
    type Handle: Send + Sync;

    async fn authenticate(&self) -> Result<Self::Handle, MailboxError>;

    /// The code from the newest matching message, or `None` when there is
    /// no such message yet (or it carries no code).
    ///
    /// Errors abort the relay; only `None` is retried.
    async fn fetch_auth_code(&self, handle: &Self::Handle) -> Result<Option<String>, MailboxError>;
}
