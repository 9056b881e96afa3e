//! One-shot loopback listener for the OAuth redirect.
//!
//! [`CallbackListener`] is bound before the browser is opened and consumed
//! by [`CallbackListener::wait_for_code`], which serves requests until one
//! carries an authorization code, then shuts the server down. The server
//! task is aborted when the wait ends for any reason (code, denial,
//! timeout, or the waiting future being dropped), so the port is always
//! released.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AuthError;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A bound, not yet serving, callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    addr: String,
}

impl CallbackListener {
    /// Bind the listener. Failing to bind (port in use, no permission for
    /// port 80) is fatal for consent.
    pub async fn bind(addr: &str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::Listener {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            listener,
            addr: addr.to_string(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AuthError> {
        self.listener.local_addr().map_err(|e| AuthError::Listener {
            addr: self.addr.clone(),
            reason: e.to_string(),
        })
    }

    /// Serve until a request delivers a code whose `state` matches
    /// `expected_state`, or until `timeout` elapses.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<String, AuthError> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CallbackState {
            expected_state: expected_state.to_string(),
            code_tx: Arc::new(Mutex::new(Some(code_tx))),
        };
        let app = Router::new().fallback(handle_callback).with_state(state);

        let listener = self.listener;
        let server = ServerTask(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "callback server stopped with an error");
            }
        }));

        let outcome = tokio::time::timeout(timeout, code_rx).await;

        let _ = shutdown_tx.send(());
        server.finish(SHUTDOWN_GRACE).await;
        debug!(addr = %self.addr, "callback listener released");

        match outcome {
            Err(_) => Err(AuthError::Timeout(timeout.as_secs())),
            Ok(Err(_)) => Err(AuthError::Listener {
                addr: self.addr,
                reason: "callback server exited before a code arrived".into(),
            }),
            Ok(Ok(result)) => result,
        }
    }
}

/// Aborts the server task on drop.
struct ServerTask(JoinHandle<()>);

impl ServerTask {
    async fn finish(mut self, grace: Duration) {
        if tokio::time::timeout(grace, &mut self.0).await.is_err() {
            self.0.abort();
        }
    }
}

impl Drop for ServerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

type CodeSender = oneshot::Sender<Result<String, AuthError>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    code_tx: Arc<Mutex<Option<CodeSender>>>,
}

impl CallbackState {
    /// Hand a result to the waiting flow. Returns false if a result was
    /// already delivered.
    fn deliver(&self, result: Result<String, AuthError>) -> bool {
        let sender = match self.code_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    if let Some(error) = params.error {
        warn!(%error, "authorization was denied");
        state.deliver(Err(AuthError::Denied(error)));
        return (
            StatusCode::BAD_REQUEST,
            "Authorization was denied. You can close this window.",
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code");
    };

    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        warn!("callback state mismatch, ignoring request");
        return (StatusCode::BAD_REQUEST, "State mismatch");
    }

    if state.deliver(Ok(code)) {
        (
            StatusCode::OK,
            "guardrelay is now authorized to read Steam Guard mail. You can close this window.",
        )
    } else {
        (StatusCode::OK, "Already authorized. You can close this window.")
    }
}
