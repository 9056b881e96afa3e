//! # guardrelay-types
//!
//! Shared type definitions for guardrelay.
//!
//! Every other guardrelay crate depends on this one. It contains:
//!
//! - **[`error`]** -- [`RelayError`] and [`MailboxError`]
//! - **[`config`]** -- `config.json` schema ([`RelayConfig`], [`PollPolicy`])
//! - **[`secret`]** -- [`SecretString`] for client secrets

pub mod config;
pub mod error;
pub mod secret;

pub use config::{MailboxSettings, PollPolicy, RelayConfig};
pub use error::{MailboxError, RelayError, Result};
pub use secret::SecretString;
