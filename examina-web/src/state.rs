//! Shared application state
//!
//! Cloned per request; everything inside is an `Arc` so clones are
//! cheap. Configuration is read once at startup and never mutated.

use std::sync::Arc;

use examina_auth::{
    AuthGate, HttpRefreshClient, IdentityRegistry, RefreshClient, RefreshCoordinator,
    SessionBackend, SessionStore,
};
use examina_core::ExaminaConfig;

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup
    pub config: Arc<ExaminaConfig>,
    /// Session persistence bound to the transport
    pub store: SessionStore,
    /// Single-flight refresh coordination
    pub coordinator: Arc<RefreshCoordinator>,
    /// Route authorization decisions
    pub gate: Arc<AuthGate>,
    /// Registered sign-in strategies
    pub identities: Arc<IdentityRegistry>,
}

impl AppState {
    /// Assemble state from explicit collaborators. Tests inject mock
    /// backends and refresh clients here.
    pub fn new(
        config: ExaminaConfig,
        backend: Arc<dyn SessionBackend>,
        refresh_client: Arc<dyn RefreshClient>,
        identities: IdentityRegistry,
    ) -> Self {
        let store = SessionStore::new(backend, config.auth.session_ttl_days);
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            refresh_client,
            &config.auth,
        ));
        let gate = Arc::new(AuthGate::new(config.routes.clone()));

        Self {
            config: Arc::new(config),
            store,
            coordinator,
            gate,
            identities: Arc::new(identities),
        }
    }

    /// State wired to the issuer's HTTP refresh endpoint
    pub fn with_http_refresh(
        config: ExaminaConfig,
        backend: Arc<dyn SessionBackend>,
        identities: IdentityRegistry,
    ) -> Self {
        let client = Arc::new(HttpRefreshClient::new(config.auth.refresh_url.clone()));
        Self::new(config, backend, client, identities)
    }
}
