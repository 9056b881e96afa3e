//! Google OAuth2 for guardrelay's Gmail access.
//!
//! Implements the installed-app authorization code flow with PKCE:
//!
//! 1. [`OAuth2Client::begin_authorization`] builds the consent URL.
//! 2. The URL is opened in the default browser.
//! 3. [`callback::CallbackListener`] receives the redirect on the loopback
//!    address and hands back the code.
//! 4. [`OAuth2Client::exchange_code`] trades the code for tokens, which
//!    [`TokenStore`] persists to `token.json`.
//!
//! [`Authenticator`] wraps the whole thing: it returns the cached token when
//! it is still valid, refreshes it when it has expired, and only falls back
//! to interactive consent when neither works.
//!
//! # Security
//!
//! - Random `state` checked on the callback (CSRF).
//! - PKCE S256 challenge on every consent.
//! - `client_secret` held in a redacting `SecretString`.
//! - `token.json` written atomically with 0600 permissions.

pub mod callback;
pub mod client;
pub mod error;
pub mod token_store;
pub mod types;

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

pub use client::OAuth2Client;
pub use error::AuthError;
pub use token_store::TokenStore;
pub use types::{
    AppCredentials, ClientSecrets, GMAIL_READONLY_SCOPE, PendingAuthorization, StoredTokens,
};

use callback::CallbackListener;

/// Redirect URI Google expects for a loopback listener on `addr`.
///
/// Port 80 is left implicit so the default `localhost:80` listener matches
/// the `http://localhost` redirect registered for desktop clients.
pub fn redirect_uri_for(addr: &str) -> String {
    let host = addr.strip_suffix(":80").unwrap_or(addr);
    format!("http://{host}")
}

/// Obtains a usable Gmail credential, interactively if it has to.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: OAuth2Client,
    store: TokenStore,
    callback_addr: String,
    callback_timeout: Duration,
    open_browser: bool,
}

impl Authenticator {
    pub fn new(
        client: OAuth2Client,
        store: TokenStore,
        callback_addr: impl Into<String>,
        callback_timeout: Duration,
    ) -> Self {
        Self {
            client,
            store,
            callback_addr: callback_addr.into(),
            callback_timeout,
            open_browser: true,
        }
    }

    /// Build an authenticator from a `credentials.json` file. The redirect
    /// URI is derived from `callback_addr`.
    pub fn from_credentials_file(
        credentials_path: &Path,
        store: TokenStore,
        callback_addr: &str,
        callback_timeout: Duration,
    ) -> Result<Self, AuthError> {
        let app = ClientSecrets::load(credentials_path)?;
        let client = OAuth2Client::new(
            app,
            redirect_uri_for(callback_addr),
            vec![GMAIL_READONLY_SCOPE.to_string()],
        );
        Ok(Self::new(client, store, callback_addr, callback_timeout))
    }

    /// Do not launch a browser during consent; the URL is only logged.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Return a valid credential.
    ///
    /// Order of preference: cached and unexpired, cached and refreshable,
    /// interactive consent. An unreadable cache or a failed refresh falls
    /// through to consent rather than aborting.
    pub async fn authenticate(&self) -> Result<StoredTokens, AuthError> {
        let cached = match self.store.load() {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable token cache");
                None
            }
        };

        match cached {
            Some(tokens) if !tokens.is_expired() => {
                info!(path = %self.store.path().display(), "using cached Gmail token");
                Ok(tokens)
            }
            Some(tokens) if tokens.refresh_token.is_some() => match self.refresh(&tokens).await {
                Ok(fresh) => Ok(fresh),
                Err(e) => {
                    warn!(error = %e, "token refresh failed, requesting consent again");
                    self.consent().await
                }
            },
            Some(_) => {
                info!("cached token expired and cannot be refreshed");
                self.consent().await
            }
            None => self.consent().await,
        }
    }

    /// Refresh `tokens` and persist the replacement.
    pub async fn refresh(&self, tokens: &StoredTokens) -> Result<StoredTokens, AuthError> {
        let fresh = self.client.refresh(tokens).await?;
        self.store.store(&fresh)?;
        info!("refreshed Gmail token");
        Ok(fresh)
    }

    /// Run interactive consent and persist the resulting token.
    pub async fn consent(&self) -> Result<StoredTokens, AuthError> {
        let pending = self.client.begin_authorization()?;
        self.complete_consent(&pending).await
    }

    async fn complete_consent(&self, pending: &PendingAuthorization) -> Result<StoredTokens, AuthError> {
        // Bind first so the redirect cannot arrive before anyone listens.
        let listener = CallbackListener::bind(&self.callback_addr).await?;

        info!(
            url = %pending.authorize_url,
            "open this URL in a browser to let guardrelay read Steam Guard mail"
        );
        info!(addr = %self.callback_addr, "waiting for the authorization callback");
        if self.open_browser {
            if let Err(e) = open::that(&pending.authorize_url) {
                warn!(error = %e, "could not open a browser; open the URL manually");
            }
        }

        let code = listener
            .wait_for_code(&pending.state, self.callback_timeout)
            .await?;
        let tokens = self.client.exchange_code(pending, &code).await?;
        self.store.store(&tokens)?;
        info!(path = %self.store.path().display(), "saved Gmail token");
        Ok(tokens)
    }
}
