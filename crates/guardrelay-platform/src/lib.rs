//! Platform layer for guardrelay.
//!
//! Everything that touches the operating system lives here so the relay
//! loop in `guardrelay-core` can be driven by test doubles:
//!
//! - [`process::ProcessSpawner`] runs an executable and returns its exit
//!   status plus captured output. [`process::NativeProcessSpawner`] echoes
//!   the child's output to the terminal while capturing it, through the
//!   fan-out writer in [`tee`].
//! - [`env::Environment`] reads environment variables.
//! - [`config_loader`] finds, reads and (when absent) creates `config.json`.

pub mod config_loader;
pub mod env;
pub mod process;
pub mod tee;

pub use process::{NativeProcessSpawner, ProcessOutput, ProcessSpawner};
pub use tee::TeeWriter;
