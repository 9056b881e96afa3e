//! Authorization URL construction and token endpoint calls.

use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::error::AuthError;
use crate::types::{AppCredentials, PendingAuthorization, StoredTokens, TokenResponse};

/// Talks to Google's authorization and token endpoints for one client.
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    app: AppCredentials,
    redirect_uri: String,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl OAuth2Client {
    pub fn new(app: AppCredentials, redirect_uri: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            app,
            redirect_uri: redirect_uri.into(),
            scopes,
            http: reqwest::Client::new(),
        }
    }

    /// Start a consent request: fresh `state` and PKCE verifier, and the
    /// URL the user has to visit.
    pub fn begin_authorization(&self) -> Result<PendingAuthorization, AuthError> {
        let state = generate_state();
        let pkce_verifier = generate_pkce_verifier();
        let challenge = compute_pkce_challenge(&pkce_verifier);

        let mut url = url::Url::parse(&self.app.auth_uri)
            .map_err(|e| AuthError::Credentials(format!("invalid auth_uri: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.app.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline");

        Ok(PendingAuthorization {
            authorize_url: url.to_string(),
            state,
            pkce_verifier,
        })
    }

    /// Exchange the callback's authorization code for tokens.
    pub async fn exchange_code(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<StoredTokens, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.expose()),
            ("code_verifier", pending.pkce_verifier.as_str()),
        ];
        let response = self.token_request(&form, "token exchange").await?;
        debug!("authorization code exchanged");
        response.into_stored(chrono::Utc::now(), None)
    }

    /// Obtain a new access token. The returned credential replaces
    /// `tokens` entirely; the old refresh token is carried over only when
    /// Google does not rotate it.
    pub async fn refresh(&self, tokens: &StoredTokens) -> Result<StoredTokens, AuthError> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::TokenRequest("no refresh token available".into()))?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.expose()),
        ];
        let response = self.token_request(&form, "token refresh").await?;
        debug!("access token refreshed");
        response.into_stored(chrono::Utc::now(), tokens.refresh_token.clone())
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
        what: &str,
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.app.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequest(format!("{what} failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AuthError::TokenRequest(format!("{what}: failed to parse response ({status}): {e}"))
        })?;

        if !status.is_success() {
            let error = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(AuthError::TokenRequest(format!(
                "{what} failed ({status}): {error}"
            )));
        }

        serde_json::from_value(body)
            .map_err(|e| AuthError::TokenRequest(format!("{what}: unexpected response: {e}")))
    }
}

/// 32 random bytes, hex encoded.
fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// 32 random bytes, base64url encoded (43 characters).
fn generate_pkce_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    base64_url(&bytes)
}

/// S256 challenge for `verifier`.
fn compute_pkce_challenge(verifier: &str) -> String {
    use sha2::Digest;
    base64_url(&sha2::Sha256::digest(verifier.as_bytes()))
}

fn base64_url(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
