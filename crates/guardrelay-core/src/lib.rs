//! # guardrelay-core
//!
//! The SteamCMD relay loop.
//!
//! - **[`args`]** -- SteamCMD argument list handling (`+quit`, Steam Guard code)
//! - **[`classify`]** -- decides whether a failed run is waiting on Steam Guard
//! - **[`mailbox`]** -- the [`Mailbox`] seam the loop polls for codes
//! - **[`relay`]** -- [`Relay`], which ties the above together
//!
//! The loop only ever talks to SteamCMD through
//! [`guardrelay_platform::ProcessSpawner`] and to the inbox through
//! [`Mailbox`], so it runs against test doubles without a real process or
//! network.

pub mod args;
pub mod classify;
pub mod mailbox;
pub mod relay;

pub use args::{GUARD_CODE_FLAG, QUIT_FLAG, apply_guard_code, invocation_args, normalize_args};
pub use classify::{Outcome, STEAM_GUARD_SIGNATURE, classify};
pub use mailbox::Mailbox;
pub use relay::{Relay, RunOutcome, RunReport};
