//! Examina Web Server
//!
//! Main web server implementation using Axum.
//!
//! The session backend is the caller's choice: `SessionStore` assumes
//! the transport isolates sessions, so a multi-client deployment must
//! supply a backend keyed per client. `single_session` wires one
//! in-memory slot and is meant for a single signed-in identity
//! (local tooling, demos, tests); it is never the silent default.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use examina_auth::{IdentityRegistry, MemoryBackend, SessionBackend};
use examina_core::ExaminaConfig;

/// Main Examina web server
pub struct ExaminaServer {
    config: WebConfig,
    state: AppState,
}

impl ExaminaServer {
    /// Create a new Examina server over an explicit session backend
    pub fn new(
        config: WebConfig,
        app_config: ExaminaConfig,
        backend: Arc<dyn SessionBackend>,
        identities: IdentityRegistry,
    ) -> WebResult<Self> {
        app_config
            .validate()
            .map_err(|e| WebError::Config(e.to_string()))?;

        let state = AppState::with_http_refresh(app_config, backend, identities);

        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("🚀 Starting Examina Web Server");
        info!("📍 Server address: http://{}", address);
        info!(
            "🔐 Token issuer: {}",
            self.state.config.auth.refresh_url
        );

        // Create the application
        let app = create_app(self.state.clone());

        // Create TCP listener
        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("✅ Server listening on http://{}", address);

        // Start the server
        if let Err(e) = serve(listener, app).await {
            error!("❌ Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for ExaminaServer
pub struct ExaminaServerBuilder {
    config: WebConfig,
    app_config: ExaminaConfig,
    backend: Option<Arc<dyn SessionBackend>>,
    identities: IdentityRegistry,
}

impl ExaminaServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            app_config: ExaminaConfig::default(),
            backend: None,
            identities: IdentityRegistry::new(),
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Use a loaded application configuration
    pub fn app_config(mut self, app_config: ExaminaConfig) -> Self {
        self.app_config = app_config;
        self
    }

    /// Use a session backend supplied by the deployment
    pub fn session_backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Serve exactly one signed-in identity from an in-memory slot.
    /// Every client of the process shares that one session, so this is
    /// only suitable for local tooling and demos.
    pub fn single_session(self) -> Self {
        self.session_backend(Arc::new(MemoryBackend::new()))
    }

    /// Register sign-in strategies
    pub fn identities(mut self, identities: IdentityRegistry) -> Self {
        self.identities = identities;
        self
    }

    /// Build the server
    pub fn build(self) -> WebResult<ExaminaServer> {
        let backend = self.backend.ok_or_else(|| {
            WebError::Config(
                "no session backend configured; use session_backend() or single_session()"
                    .to_string(),
            )
        })?;
        ExaminaServer::new(self.config, self.app_config, backend, self.identities)
    }
}

impl Default for ExaminaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
