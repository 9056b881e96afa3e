//! Client secrets, cached tokens and token endpoint responses.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use guardrelay_types::SecretString;

use crate::error::AuthError;

/// Scope requested during consent: read-only Gmail access.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Seconds before `expiry` at which a token is already treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// `credentials.json` as downloaded from the Google Cloud console.
///
/// Desktop clients put their fields under `installed`, web clients under
/// `web`; either is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    #[serde(default)]
    installed: Option<AppCredentials>,
    #[serde(default)]
    web: Option<AppCredentials>,
}

impl ClientSecrets {
    /// Parse client secrets and return the app section.
    pub fn from_json(json: &str) -> Result<AppCredentials, AuthError> {
        let secrets: ClientSecrets = serde_json::from_str(json)
            .map_err(|e| AuthError::Credentials(format!("invalid JSON: {e}")))?;
        secrets.installed.or(secrets.web).ok_or_else(|| {
            AuthError::Credentials("expected an \"installed\" or \"web\" section".into())
        })
    }

    /// Read and parse the client secrets file.
    pub fn load(path: &Path) -> Result<AppCredentials, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Credentials(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

/// OAuth client registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".into()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

/// The cached credential persisted in `token.json`.
///
/// A refresh replaces the whole value; fields are never patched in place
/// on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// RFC 3339 expiry. The Unix epoch or earlier (Go's zero time is
    /// `0001-01-01T00:00:00Z`) means the token does not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl StoredTokens {
    /// Check if the access token has expired (with a 60-second buffer).
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) if expiry.timestamp() > 0 => {
                now >= expiry - Duration::seconds(EXPIRY_BUFFER_SECS)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Successful token endpoint response (exchange or refresh).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert into a stored credential issued at `now`, keeping
    /// `previous_refresh` when the response does not rotate it.
    ///
    /// An `expires_in` that does not fit a timestamp is rejected.
    pub fn into_stored(
        self,
        now: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Result<StoredTokens, AuthError> {
        let expiry = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        AuthError::TokenRequest(format!("expires_in out of range: {secs}"))
                    })?,
            ),
            None => None,
        };
        Ok(StoredTokens {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(default_token_type),
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry,
        })
    }
}

/// An authorization request waiting for its browser callback.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// URL the user must open to grant consent.
    pub authorize_url: String,
    /// CSRF token echoed back on the callback.
    pub state: String,
    pub(crate) pkce_verifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED_JSON: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "steam-relay",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "GOCSPX-secret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn parses_installed_credentials() {
        let app = ClientSecrets::from_json(INSTALLED_JSON).unwrap();
        assert_eq!(app.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(app.client_secret.expose(), "GOCSPX-secret");
        assert_eq!(app.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(app.redirect_uris, vec!["http://localhost"]);
        assert!(!format!("{app:?}").contains("GOCSPX-secret"));
    }

    #[test]
    fn parses_web_credentials_with_defaults() {
        let app = ClientSecrets::from_json(
            r#"{"web": {"client_id": "abc", "client_secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(app.client_id, "abc");
        assert_eq!(app.auth_uri, default_auth_uri());
        assert!(app.redirect_uris.is_empty());
    }

    #[test]
    fn rejects_credentials_without_app_section() {
        let err = ClientSecrets::from_json(r#"{"type": "service_account"}"#).unwrap_err();
        assert!(matches!(err, AuthError::Credentials(_)));
    }

    #[test]
    fn load_missing_file_is_credentials_error() {
        let err = ClientSecrets::load(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(err.to_string().contains("unable to read"));
    }

    #[test]
    fn reads_token_written_by_go_oauth2() {
        let json = r#"{
            "access_token": "ya29.a0Af",
            "token_type": "Bearer",
            "refresh_token": "1//0g-refresh",
            "expiry": "2031-05-04T10:20:30.123456789+02:00"
        }"#;
        let tokens: StoredTokens = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0g-refresh"));
        assert!(!tokens.is_expired());
    }

    #[test]
    fn zero_expiry_never_expires() {
        let tokens: StoredTokens = serde_json::from_str(
            r#"{"access_token": "t", "expiry": "0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!tokens.is_expired());
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[test]
    fn expiry_buffer_applies() {
        let now = Utc::now();
        let tokens = StoredTokens {
            access_token: "t".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: Some(now + Duration::seconds(30)),
        };
        assert!(tokens.is_expired_at(now));
        assert!(!tokens.is_expired_at(now - Duration::seconds(60)));
    }

    #[test]
    fn debug_redacts_access_token() {
        let tokens = StoredTokens {
            access_token: "ya29.secret".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("1//refresh".into()),
            expiry: None,
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("ya29.secret"));
        assert!(!debug.contains("1//refresh"));
    }

    #[test]
    fn token_response_keeps_previous_refresh_token() {
        let now = Utc::now();
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "new", "expires_in": 3599}"#).unwrap();
        let stored = response
            .into_stored(now, Some("old-refresh".into()))
            .unwrap();
        assert_eq!(stored.access_token, "new");
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(stored.expiry, Some(now + Duration::seconds(3599)));
    }

    #[test]
    fn huge_expires_in_is_a_token_error() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "t", "expires_in": 9223372036854775807}"#,
        )
        .unwrap();
        let err = response.into_stored(Utc::now(), None).unwrap_err();
        assert!(matches!(err, AuthError::TokenRequest(_)));
        assert!(err.to_string().contains("expires_in"));
    }
}
