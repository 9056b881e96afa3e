//! Gmail REST client implementing [`Mailbox`].

use async_trait::async_trait;
use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use guardrelay_core::Mailbox;
use guardrelay_oauth2::{Authenticator, StoredTokens};
use guardrelay_types::{MailboxError, MailboxSettings, RelayError};

use crate::extract::CodeExtractor;
use crate::types::{Message, MessageList};

/// Gmail body data is URL-safe base64; padding is present on some parts
/// and not on others.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Authenticated Gmail credential for one guardrelay run.
///
/// The token is swapped for a refreshed one when it expires mid-run.
pub struct GmailSession {
    tokens: Mutex<StoredTokens>,
}

impl GmailSession {
    pub fn new(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    pub async fn tokens(&self) -> StoredTokens {
        self.tokens.lock().await.clone()
    }
}

/// Searches Gmail for Steam Guard mail.
pub struct GmailMailbox {
    auth: Authenticator,
    http: reqwest::Client,
    api_base: String,
    query: String,
    extractor: CodeExtractor,
}

impl GmailMailbox {
    /// Fails when `settings.code_pattern` is not a usable regex.
    pub fn new(auth: Authenticator, settings: &MailboxSettings) -> Result<Self, RelayError> {
        Ok(Self {
            auth,
            http: reqwest::Client::new(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            query: settings.query.clone(),
            extractor: CodeExtractor::new(&settings.code_pattern)?,
        })
    }

    /// Current access token, refreshed first if it has expired.
    async fn access_token(&self, session: &GmailSession) -> Result<String, MailboxError> {
        let mut tokens = session.tokens.lock().await;
        if tokens.is_expired() {
            debug!("Gmail token expired, refreshing");
            *tokens = self.auth.refresh(&tokens).await?;
        }
        Ok(tokens.access_token.clone())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailboxError> {
        let url = format!("{}/gmail/v1/users/me/{path}", self.api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| MailboxError::QueryFailed(format!("GET {path}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MailboxError::AuthFailed(format!(
                "Gmail rejected the access token ({status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::QueryFailed(format!(
                "GET {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MailboxError::QueryFailed(format!("GET {path}: invalid response: {e}")))
    }

    /// Decode every body part of `message` and return the first code found.
    fn code_from_message(&self, message: &Message) -> Result<Option<String>, MailboxError> {
        let Some(payload) = &message.payload else {
            return Ok(None);
        };
        for encoded in payload.encoded_bodies() {
            let bytes = GMAIL_BASE64
                .decode(encoded)
                .map_err(|e| MailboxError::Malformed {
                    message_id: message.id.clone(),
                    reason: format!("body is not base64url: {e}"),
                })?;
            let body = String::from_utf8_lossy(&bytes);
            if let Some(code) = self.extractor.extract(&body) {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    type Handle = GmailSession;

    async fn authenticate(&self) -> Result<GmailSession, MailboxError> {
        let tokens = self.auth.authenticate().await?;
        Ok(GmailSession::new(tokens))
    }

    async fn fetch_auth_code(&self, session: &GmailSession) -> Result<Option<String>, MailboxError> {
        let token = self.access_token(session).await?;

        let list: MessageList = self
            .get_json(&token, "messages", &[("q", self.query.as_str())])
            .await?;
        let Some(newest) = list.messages.first() else {
            debug!(query = %self.query, "no matching mail");
            return Ok(None);
        };

        let message: Message = self
            .get_json(&token, &format!("messages/{}", newest.id), &[("format", "full")])
            .await?;
        let code = self.code_from_message(&message)?;
        match &code {
            Some(_) => info!(message_id = %message.id, "found Steam Guard mail"),
            None => debug!(message_id = %message.id, "newest mail carries no login code"),
        }
        Ok(code)
    }
}
