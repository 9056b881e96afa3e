//! Environment variable access.
//!
//! Config discovery reads `GUARDRELAY_CONFIG` through [`Environment`] so
//! tests can supply variables without mutating the process environment.

/// Read-only view of environment variables.
pub trait Environment: Send + Sync {
    /// Get the value of a variable, or `None` if it is unset or not UTF-8.
    fn get_var(&self, name: &str) -> Option<String>;
}

/// [`Environment`] backed by [`std::env`].
pub struct NativeEnvironment;

impl Environment for NativeEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
