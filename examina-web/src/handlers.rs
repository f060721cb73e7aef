//! HTTP handlers for sign-in, sign-out, and session introspection
//!
//! Sign-in dispatches through the identity registry; its typed errors
//! are surfaced verbatim with stable tags for user-facing messaging.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::info;

use examina_auth::{Credentials, SignInError};

use crate::middleware::CurrentUser;
use crate::AppState;

/// Sign-in error mapped onto an HTTP response with a stable tag
pub struct ApiError(pub SignInError);

impl From<SignInError> for ApiError {
    fn from(e: SignInError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SignInError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            SignInError::EmailUnverified | SignInError::AccountDisabled => StatusCode::FORBIDDEN,
            SignInError::UnknownStrategy(_) => StatusCode::BAD_REQUEST,
            SignInError::ProviderError(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.0.error_tag(),
            "message": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Sign-in endpoint
///
/// Dispatches to the registered strategy named in the payload and
/// persists the issued token pair on success.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
    info!(strategy = credentials.strategy(), "sign-in attempt");

    let session = state
        .identities
        .sign_in_and_store(&state.store, &credentials)
        .await?;

    Ok(Json(json!({
        "user": session.user,
        "expires_at": session.expires_at,
    })))
}

/// Sign-out endpoint; clearing an absent session is not an error
pub async fn sign_out(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if let Err(e) = state.store.clear().await {
        tracing::error!("sign-out failed to clear session: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(json!({ "message": "Signed out" })))
}

/// Current session's user projection
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

/// Landing page placeholder
pub async fn home() -> Json<Value> {
    Json(json!({ "page": "home" }))
}

/// Login page placeholder (AuthOnly: signed-in users never see it)
pub async fn login_page() -> Json<Value> {
    Json(json!({ "page": "login" }))
}

/// Onboarding page placeholder (FirstLoginOnly)
pub async fn onboarding(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "page": "onboarding", "user": user }))
}

/// Role dashboards; the gate guarantees the matching role
pub async fn dashboard(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "page": "dashboard", "user": user }))
}

/// Teacher course listing stub behind the role-restricted API prefix
pub async fn teacher_courses(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "courses": [], "owner": user.id }))
}
