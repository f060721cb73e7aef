//! Sign-in strategy contract
//!
//! Identity adapters are external collaborators: each strategy turns
//! credentials into an initial token pair or fails with a typed error.
//! This module owns the contract, the error taxonomy with its stable
//! user-facing tags, and the registry that dispatches a sign-in and
//! persists its result. The adapters themselves (password check,
//! access-code verification, OAuth handshake) live with the issuer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::session::{Session, SessionStore};
use crate::token::TokenPair;

/// Credentials for the platform's sign-in strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Credentials {
    /// Email and password against the platform's own accounts
    Password { email: String, password: String },
    /// Institution access code plus national ID
    AccessCode { code: String, national_id: String },
    /// Third-party OAuth authorization code
    Oauth {
        provider: String,
        authorization_code: String,
    },
}

impl Credentials {
    /// Strategy name used for registry dispatch
    pub fn strategy(&self) -> &'static str {
        match self {
            Credentials::Password { .. } => "password",
            Credentials::AccessCode { .. } => "access_code",
            Credentials::Oauth { .. } => "oauth",
        }
    }
}

/// Sign-in failures surfaced verbatim to the caller; never retried here
#[derive(Debug, Clone, Error)]
pub enum SignInError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email address not verified")]
    EmailUnverified,
    #[error("Account disabled")]
    AccountDisabled,
    #[error("Identity provider error: {0}")]
    ProviderError(String),
    #[error("Unknown sign-in strategy: {0}")]
    UnknownStrategy(String),
}

impl SignInError {
    /// Stable user-facing tag for each kind
    pub fn error_tag(&self) -> &'static str {
        match self {
            SignInError::InvalidCredentials => "invalid_credentials",
            SignInError::EmailUnverified => "email_unverified",
            SignInError::AccountDisabled => "account_disabled",
            SignInError::ProviderError(_) => "provider_error",
            SignInError::UnknownStrategy(_) => "unknown_strategy",
        }
    }
}

/// One pluggable sign-in strategy
#[async_trait]
pub trait IdentityAdapter: Send + Sync {
    /// Strategy name this adapter answers for
    fn name(&self) -> &'static str;

    /// Exchange credentials for an initial token pair
    async fn sign_in(&self, credentials: &Credentials) -> Result<TokenPair, SignInError>;
}

/// Registry of sign-in strategies keyed by name
#[derive(Default)]
pub struct IdentityRegistry {
    adapters: HashMap<&'static str, Arc<dyn IdentityAdapter>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, adapter: Arc<dyn IdentityAdapter>) -> Self {
        self.adapters.insert(adapter.name(), adapter);
        self
    }

    /// Dispatch a sign-in to the matching strategy, persist the token
    /// pair on success, and return the derived session.
    pub async fn sign_in_and_store(
        &self,
        store: &SessionStore,
        credentials: &Credentials,
    ) -> Result<Session, SignInError> {
        let strategy = credentials.strategy();
        let adapter = self
            .adapters
            .get(strategy)
            .ok_or_else(|| SignInError::UnknownStrategy(strategy.to_string()))?;

        let tokens = adapter.sign_in(credentials).await.map_err(|e| {
            if let SignInError::ProviderError(detail) = &e {
                // Provider errors are never swallowed silently
                error!(strategy, detail, "identity provider failure during sign-in");
            }
            e
        })?;

        store.save(&tokens).await.map_err(|e| {
            SignInError::ProviderError(format!("session could not be persisted: {}", e))
        })?;

        let session = store.load().await.ok_or_else(|| {
            SignInError::ProviderError("issuer returned an undecodable access token".to_string())
        })?;

        info!(strategy, user = %session.user.id, "sign-in succeeded");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryBackend;
    use crate::token::test_tokens;
    use chrono::{Duration, Utc};
    use examina_core::Role;

    struct StubAdapter {
        name: &'static str,
        outcome: Result<TokenPair, SignInError>,
    }

    #[async_trait]
    impl IdentityAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn sign_in(&self, _credentials: &Credentials) -> Result<TokenPair, SignInError> {
            self.outcome.clone()
        }
    }

    fn password_credentials() -> Credentials {
        Credentials::Password {
            email: "teacher@example.edu".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_sign_in_persists_and_derives_session() {
        let access = test_tokens::issue("user-3", Role::Teacher, Utc::now() + Duration::hours(1));
        let registry = IdentityRegistry::new().register(Arc::new(StubAdapter {
            name: "password",
            outcome: Ok(TokenPair {
                access,
                refresh: "refresh-3".to_string(),
            }),
        }));
        let store = SessionStore::new(Arc::new(MemoryBackend::new()), 7);

        let session = registry
            .sign_in_and_store(&store, &password_credentials())
            .await
            .unwrap();

        assert_eq!(session.user.id, "user-3");
        assert_eq!(session.user.role, Role::Teacher);
        assert!(store.load().await.is_some());
    }

    #[tokio::test]
    async fn failed_sign_in_is_surfaced_verbatim() {
        let registry = IdentityRegistry::new().register(Arc::new(StubAdapter {
            name: "password",
            outcome: Err(SignInError::InvalidCredentials),
        }));
        let store = SessionStore::new(Arc::new(MemoryBackend::new()), 7);

        let err = registry
            .sign_in_and_store(&store, &password_credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, SignInError::InvalidCredentials));
        assert!(store.load().await.is_none(), "failure leaves no session");
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected() {
        let registry = IdentityRegistry::new();
        let store = SessionStore::new(Arc::new(MemoryBackend::new()), 7);

        let err = registry
            .sign_in_and_store(&store, &password_credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, SignInError::UnknownStrategy(_)));
    }

    #[test]
    fn error_tags_are_stable() {
        assert_eq!(SignInError::InvalidCredentials.error_tag(), "invalid_credentials");
        assert_eq!(SignInError::EmailUnverified.error_tag(), "email_unverified");
        assert_eq!(SignInError::AccountDisabled.error_tag(), "account_disabled");
        assert_eq!(
            SignInError::ProviderError("boom".to_string()).error_tag(),
            "provider_error"
        );
    }

    #[test]
    fn credentials_dispatch_by_strategy_tag() {
        let creds: Credentials = serde_json::from_value(serde_json::json!({
            "strategy": "access_code",
            "code": "INST-2024",
            "national_id": "1234567890",
        }))
        .unwrap();
        assert_eq!(creds.strategy(), "access_code");
    }
}
