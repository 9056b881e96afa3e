//! `config.json` schema.
//!
//! Only `steamcmd_path` is required in practice; every other key has a
//! default so a config written by hand with a single key keeps working.
//! Keys are accepted in snake_case or camelCase.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Top-level guardrelay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Path to the SteamCMD executable.
    #[serde(default = "default_steamcmd_path", alias = "steamcmdPath")]
    pub steamcmd_path: String,

    /// Google OAuth client secret file (installed-app JSON).
    #[serde(default = "default_credentials_path", alias = "credentialsPath")]
    pub credentials_path: PathBuf,

    /// Cached OAuth token file, created and overwritten by guardrelay.
    #[serde(default = "default_token_path", alias = "tokenPath")]
    pub token_path: PathBuf,

    /// Mailbox polling policy applied each time Steam Guard blocks a run.
    #[serde(default)]
    pub poll: PollPolicy,

    /// Upper bound on SteamCMD invocations in one guardrelay run.
    #[serde(default = "default_max_invocations", alias = "maxInvocations")]
    pub max_invocations: u32,

    /// Address of the loopback listener used during OAuth consent.
    #[serde(default = "default_callback_addr", alias = "callbackAddr")]
    pub callback_addr: String,

    /// How long consent waits for the browser callback.
    #[serde(default = "default_callback_timeout", alias = "callbackTimeoutSecs")]
    pub callback_timeout_secs: u64,

    /// Gmail query and code extraction settings.
    #[serde(default)]
    pub mailbox: MailboxSettings,
}

fn default_steamcmd_path() -> String {
    "./steamcmd/steamcmd.exe".into()
}
fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}
fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}
fn default_max_invocations() -> u32 {
    5
}
fn default_callback_addr() -> String {
    "localhost:80".into()
}
fn default_callback_timeout() -> u64 {
    300
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            steamcmd_path: default_steamcmd_path(),
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            poll: PollPolicy::default(),
            max_invocations: default_max_invocations(),
            callback_addr: default_callback_addr(),
            callback_timeout_secs: default_callback_timeout(),
            mailbox: MailboxSettings::default(),
        }
    }
}

impl RelayConfig {
    /// Reject values the relay loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.steamcmd_path.trim().is_empty() {
            return Err(RelayError::ConfigInvalid {
                reason: "steamcmd_path is empty".into(),
            });
        }
        if self.max_invocations == 0 {
            return Err(RelayError::ConfigInvalid {
                reason: "max_invocations must be at least 1".into(),
            });
        }
        if self.poll.max_poll_attempts == 0 {
            return Err(RelayError::ConfigInvalid {
                reason: "poll.max_poll_attempts must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

/// Bounded, fixed-interval mailbox polling.
///
/// No exponential growth and no jitter: each attempt that finds no code
/// waits exactly `poll_interval_secs` before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(default = "default_max_poll_attempts", alias = "maxPollAttempts")]
    pub max_poll_attempts: u32,

    #[serde(default = "default_poll_interval", alias = "pollIntervalSecs")]
    pub poll_interval_secs: u64,
}

fn default_max_poll_attempts() -> u32 {
    12
}
fn default_poll_interval() -> u64 {
    10
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_poll_attempts: default_max_poll_attempts(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl PollPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Where Steam Guard mail is searched for and how the code is pulled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxSettings {
    /// Gmail search filter.
    #[serde(default = "default_query")]
    pub query: String,

    /// Regex whose first capture group is the login code.
    #[serde(default = "default_code_pattern", alias = "codePattern")]
    pub code_pattern: String,

    /// Gmail API base URL.
    #[serde(default = "default_api_base", alias = "apiBase")]
    pub api_base: String,
}

fn default_query() -> String {
    "from:noreply@steampowered.com is:unread".into()
}
fn default_code_pattern() -> String {
    r"Login Code\s*([A-Za-z0-9]+)".into()
}
fn default_api_base() -> String {
    "https://gmail.googleapis.com".into()
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            query: default_query(),
            code_pattern: default_code_pattern(),
            api_base: default_api_base(),
        }
    }
}
