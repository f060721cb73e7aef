//! Single-flight token refresh coordination
//!
//! For any set of concurrent callers observing the same expired session
//! identity, at most one refresh request reaches the issuer and every
//! caller receives the identical outcome. Flight state is created
//! lazily on the first attempt and removed as soon as the flight
//! settles; it never persists across refresh cycles.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use examina_core::AuthConfig;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::session::{Session, SessionStore};
use crate::token::TokenPair;

/// Errors produced by a refresh attempt
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// The issuer could not be reached or answered unusably.
    /// Retryable by caller policy; not retried here.
    #[error("Refresh network failure: {0}")]
    NetworkFailure(String),
    /// The issuer rejected the refresh token itself. Fatal: the session
    /// is unrecoverable and a forced logout has already been triggered.
    #[error("Refresh token rejected by issuer")]
    RefreshTokenRejected,
    /// The refresh round-trip or the wait on another caller's flight
    /// exceeded its bound.
    #[error("Refresh timed out")]
    Timeout,
}

/// Issuer-facing seam for exchanging a refresh token for a new access token
#[async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError>;
}

/// Refresh client talking to the issuer's HTTP endpoint
pub struct HttpRefreshClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(serde::Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(serde::Deserialize)]
struct RefreshResponse {
    access: String,
}

impl HttpRefreshClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl RefreshClient for HttpRefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: RefreshResponse = response
                .json()
                .await
                .map_err(|e| RefreshError::NetworkFailure(format!("unreadable refresh response: {}", e)))?;
            Ok(body.access)
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            Err(RefreshError::RefreshTokenRejected)
        } else {
            Err(RefreshError::NetworkFailure(format!(
                "refresh endpoint returned {}",
                status
            )))
        }
    }
}

/// Side-effect hook invoked when an unrefreshable session forces a logout
#[async_trait]
pub trait SignOutHook: Send + Sync {
    async fn signed_out(&self, reason: &str);
}

type FlightSender = broadcast::Sender<Result<Session, RefreshError>>;

enum FlightRole {
    Leader(FlightSender),
    Waiter(broadcast::Receiver<Result<Session, RefreshError>>),
}

/// Collapses concurrent refreshes for one session identity into a
/// single issuer call
pub struct RefreshCoordinator {
    store: SessionStore,
    client: Arc<dyn RefreshClient>,
    skew: Duration,
    refresh_timeout: std::time::Duration,
    waiter_timeout: std::time::Duration,
    flights: Mutex<HashMap<String, FlightSender>>,
    sign_out_hook: Option<Arc<dyn SignOutHook>>,
}

impl RefreshCoordinator {
    pub fn new(store: SessionStore, client: Arc<dyn RefreshClient>, auth: &AuthConfig) -> Self {
        Self {
            store,
            client,
            skew: Duration::seconds(auth.expiry_skew_secs),
            refresh_timeout: std::time::Duration::from_secs(auth.refresh_timeout_secs),
            waiter_timeout: std::time::Duration::from_secs(auth.waiter_timeout_secs),
            flights: Mutex::new(HashMap::new()),
            sign_out_hook: None,
        }
    }

    pub fn with_sign_out_hook(mut self, hook: Arc<dyn SignOutHook>) -> Self {
        self.sign_out_hook = Some(hook);
        self
    }

    /// Return the session unchanged if its token is still fresh,
    /// otherwise obtain a refreshed session.
    ///
    /// The first caller observing an expired session leads the refresh;
    /// concurrent callers for the same refresh-token identity wait on
    /// the leader's outcome. Refreshes for distinct identities proceed
    /// in parallel. A waiter that is cancelled simply drops its
    /// receiver; the in-flight refresh is shared infrastructure and is
    /// never cancelled by a waiter's departure.
    pub async fn ensure_fresh(&self, session: &Session) -> Result<Session, RefreshError> {
        if !session.is_expired(Utc::now(), self.skew) {
            return Ok(session.clone());
        }

        let identity = session.refresh_token.clone();
        let role = {
            let mut flights = self.flights.lock().await;
            match flights.get(&identity) {
                // Subscribing under the lock guarantees the waiter
                // cannot miss the leader's send.
                Some(sender) => FlightRole::Waiter(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    flights.insert(identity.clone(), sender.clone());
                    FlightRole::Leader(sender)
                }
            }
        };

        match role {
            FlightRole::Leader(sender) => {
                debug!(user = %session.user.id, "leading token refresh");
                let outcome = self.run_refresh(session).await;
                // Remove the flight before fanning out so no stale
                // in-flight marker can outlive this cycle.
                self.flights.lock().await.remove(&identity);
                let _ = sender.send(outcome.clone());
                outcome
            }
            FlightRole::Waiter(mut receiver) => {
                debug!(user = %session.user.id, "waiting on in-flight token refresh");
                match tokio::time::timeout(self.waiter_timeout, receiver.recv()).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_closed)) => Err(RefreshError::NetworkFailure(
                        "refresh flight aborted before settling".to_string(),
                    )),
                    Err(_elapsed) => Err(RefreshError::Timeout),
                }
            }
        }
    }

    async fn run_refresh(&self, session: &Session) -> Result<Session, RefreshError> {
        let attempt = tokio::time::timeout(
            self.refresh_timeout,
            self.client.refresh(&session.refresh_token),
        )
        .await;

        let access = match attempt {
            Ok(Ok(access)) => access,
            Ok(Err(RefreshError::RefreshTokenRejected)) => {
                self.force_logout().await;
                return Err(RefreshError::RefreshTokenRejected);
            }
            Ok(Err(e)) => return Err(e),
            Err(_elapsed) => return Err(RefreshError::Timeout),
        };

        let renewed = Session::derive(access, session.refresh_token.clone()).map_err(|e| {
            RefreshError::NetworkFailure(format!("issuer returned an undecodable access token: {}", e))
        })?;

        let pair = TokenPair {
            access: renewed.access_token.clone(),
            refresh: renewed.refresh_token.clone(),
        };
        if let Err(e) = self.store.save(&pair).await {
            // The renewed session is still valid for this request; the
            // next request will simply refresh again.
            warn!("renewed session could not be persisted: {}", e);
        }

        info!(user = %renewed.user.id, "access token refreshed");
        Ok(renewed)
    }

    async fn force_logout(&self) {
        warn!("refresh token rejected by issuer, clearing session");
        if let Err(e) = self.store.clear().await {
            warn!("failed to clear session during forced logout: {}", e);
        }
        if let Some(hook) = &self.sign_out_hook {
            hook.signed_out("refresh_token_rejected").await;
        }
    }
}
