//! Session representation and persistence
//!
//! A [`Session`] is derived from a signed access token and owned by the
//! request for its duration; the only thing that survives the request
//! is the encoded envelope held by the [`SessionBackend`]. Loading
//! fails closed: any decode problem yields "no session", never an
//! error the route layer has to handle.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use examina_core::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::token::{Claims, DecodeError, TokenCodec, TokenPair};

/// Read-only subset of claims relevant to rendering and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProjection {
    pub id: String,
    pub name: Option<String>,
    pub role: Role,
    pub credits: Option<i64>,
}

impl UserProjection {
    /// First-login state is derived, not stored: the account exists but
    /// onboarding has not assigned a role yet.
    pub fn is_first_login(&self) -> bool {
        self.role == Role::Unassigned
    }
}

impl From<&Claims> for UserProjection {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            name: claims.name.clone(),
            role: claims.role,
            credits: claims.credits,
        }
    }
}

/// Externally visible authentication state for one request
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProjection,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Derive a session from a token pair.
    ///
    /// This is the only constructor, so `expires_at` always matches the
    /// `exp` claim of `access_token`.
    pub fn derive(access_token: String, refresh_token: String) -> Result<Self, DecodeError> {
        let claims = TokenCodec::decode(&access_token)?;
        Ok(Self {
            user: UserProjection::from(&claims),
            expires_at: claims.expires_at(),
            access_token,
            refresh_token,
        })
    }

    /// Whether the session's access token should be treated as expired
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now >= self.expires_at - skew
    }
}

/// Opaque persisted blob handed to the transport
///
/// `envelope_expires_at` is the wall-clock lifetime the transport should
/// apply to its storage (cookie expiry); the access token's own `exp`
/// governs authorization.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub access: String,
    pub refresh: String,
    pub envelope_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Storage seam for the encoded session envelope
///
/// The transport guarantees per-session isolation; the backend only
/// sees one logical session's state.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn read(&self) -> Result<Option<String>, StoreError>;
    async fn write(&self, value: &str) -> Result<(), StoreError>;
    async fn delete(&self) -> Result<(), StoreError>;
}

/// In-memory backend for tests and single-session tooling
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.read().await.clone())
    }

    async fn write(&self, value: &str) -> Result<(), StoreError> {
        *self.state.write().await = Some(value.to_string());
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        *self.state.write().await = None;
        Ok(())
    }
}

/// Persists the current session and reconstructs it on each request
#[derive(Clone)]
pub struct SessionStore {
    backend: std::sync::Arc<dyn SessionBackend>,
    envelope_ttl: Duration,
}

impl SessionStore {
    pub fn new(backend: std::sync::Arc<dyn SessionBackend>, ttl_days: i64) -> Self {
        Self {
            backend,
            envelope_ttl: Duration::days(ttl_days),
        }
    }

    /// Reconstruct the current session, failing closed.
    ///
    /// Absent state, an unreadable backend, a corrupt envelope, and an
    /// undecodable access token all yield `None`.
    pub async fn load(&self) -> Option<Session> {
        let raw = match self.backend.read().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("Session backend unreadable, treating as logged out: {}", e);
                return None;
            }
        };

        let envelope: SessionEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Corrupt session envelope, treating as logged out: {}", e);
                return None;
            }
        };

        match Session::derive(envelope.access, envelope.refresh) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!("Undecodable access token, treating as logged out: {}", e);
                None
            }
        }
    }

    /// Persist both tokens verbatim. Tokens are not decoded on save.
    pub async fn save(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        let envelope = SessionEnvelope {
            access: tokens.access.clone(),
            refresh: tokens.refresh.clone(),
            envelope_expires_at: Utc::now() + self.envelope_ttl,
        };
        let raw = serde_json::to_string(&envelope)
            .map_err(|e| StoreError::Backend(format!("envelope serialization failed: {}", e)))?;
        self.backend.write(&raw).await
    }

    /// Delete persisted state. Clearing an absent session is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.backend.delete().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_tokens;
    use std::sync::Arc;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryBackend::new()), 7)
    }

    #[tokio::test]
    async fn load_without_state_returns_none() {
        assert!(store().load().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_claims() {
        let store = store();
        let access = test_tokens::issue("user-7", Role::Student, Utc::now() + Duration::hours(1));
        store
            .save(&TokenPair {
                access: access.clone(),
                refresh: "refresh-7".to_string(),
            })
            .await
            .unwrap();

        let session = store.load().await.expect("session should load");
        assert_eq!(session.user.id, "user-7");
        assert_eq!(session.user.role, Role::Student);
        assert_eq!(session.access_token, access);
        assert_eq!(session.refresh_token, "refresh-7");
        // Invariant: expires_at matches the access token's exp claim
        let claims = TokenCodec::decode(&access).unwrap();
        assert_eq!(session.expires_at, claims.expires_at());
    }

    #[tokio::test]
    async fn corrupt_envelope_fails_closed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("{not json").await.unwrap();

        let store = SessionStore::new(backend, 7);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn undecodable_access_token_fails_closed() {
        let store = store();
        store
            .save(&TokenPair {
                access: "garbage".to_string(),
                refresh: "refresh".to_string(),
            })
            .await
            .unwrap();

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = store();
        store.clear().await.unwrap();

        let access = test_tokens::issue("user-7", Role::Teacher, Utc::now() + Duration::hours(1));
        store
            .save(&TokenPair {
                access,
                refresh: "refresh".to_string(),
            })
            .await
            .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn expired_token_still_loads() {
        // Expired sessions must load so the refresh coordinator can act
        let store = store();
        let access = test_tokens::issue("user-7", Role::Teacher, Utc::now() - Duration::minutes(10));
        store
            .save(&TokenPair {
                access,
                refresh: "refresh".to_string(),
            })
            .await
            .unwrap();

        let session = store.load().await.expect("expired session should load");
        assert!(session.is_expired(Utc::now(), Duration::zero()));
    }

    #[test]
    fn first_login_is_derived_from_role() {
        let projection = UserProjection {
            id: "user-1".to_string(),
            name: None,
            role: Role::Unassigned,
            credits: None,
        };
        assert!(projection.is_first_login());
    }
}
