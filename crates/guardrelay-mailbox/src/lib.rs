//! Gmail-backed [`Mailbox`](guardrelay_core::Mailbox) for guardrelay.
//!
//! [`GmailMailbox`] authenticates through
//! [`guardrelay_oauth2::Authenticator`] and searches the inbox with the
//! Gmail REST API. The newest matching message is decoded part by part and
//! the first part matching the code pattern wins (see [`CodeExtractor`]).

pub mod extract;
pub mod gmail;
pub mod types;

pub use extract::CodeExtractor;
pub use gmail::{GmailMailbox, GmailSession};
