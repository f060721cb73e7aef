//! Examina Auth - Session and token lifecycle with route authorization
//!
//! This crate is the decision layer between the transport and the
//! application: it decodes access tokens into claims, keeps sessions
//! fresh with a single-flight refresh coordinator, persists session
//! state fail-closed, and classifies every request into
//! allow / redirect / deny before application logic runs.

pub mod gate;
pub mod identity;
pub mod refresh;
pub mod session;
pub mod token;

pub use gate::{AuthDecision, AuthGate};
pub use identity::{Credentials, IdentityAdapter, IdentityRegistry, SignInError};
pub use refresh::{HttpRefreshClient, RefreshClient, RefreshCoordinator, RefreshError, SignOutHook};
pub use session::{
    MemoryBackend, Session, SessionBackend, SessionEnvelope, SessionStore, StoreError,
    UserProjection,
};
pub use token::{Claims, DecodeError, TokenCodec, TokenPair};
