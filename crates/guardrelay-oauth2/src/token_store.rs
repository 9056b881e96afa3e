//! `token.json` persistence.
//!
//! Writes go to a sibling temp file first and are renamed over the target,
//! so an interrupted write never leaves a truncated token behind. On unix
//! the file is created with mode 0600.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AuthError;
use crate::types::StoredTokens;

/// File-backed cache for the Gmail credential.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token, `None` if no token has been stored yet.
    pub fn load(&self) -> Result<Option<StoredTokens>, AuthError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Store(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let tokens = serde_json::from_str(&json).map_err(|e| {
            AuthError::Store(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "loaded cached token");
        Ok(Some(tokens))
    }

    /// Replace the cached token.
    pub fn store(&self, tokens: &StoredTokens) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AuthError::Store(format!("failed to create token dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(tokens)
            .map_err(|e| AuthError::Store(format!("failed to serialize token: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| AuthError::Store(format!("failed to write token file: {e}")))?;
        restrict_permissions(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| AuthError::Store(format!("failed to rename token file: {e}")))?;

        debug!(path = %self.path.display(), "stored token");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| AuthError::Store(format!("failed to set file permissions: {e}")))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), AuthError> {
    Ok(())
}
