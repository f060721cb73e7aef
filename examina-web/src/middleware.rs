//! Request authorization middleware
//!
//! Runs once per inbound request before dispatch: loads the session,
//! keeps it fresh through the refresh coordinator, asks the gate for a
//! decision, and honors it. Handlers only run after `Allow`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use examina_auth::{AuthDecision, Session, UserProjection};

use crate::AppState;

/// Authorization middleware applied to the whole router
pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let session = resolve_session(&state).await;
    let decision = state.gate.decide_path(session.as_ref(), &path);

    match decision {
        AuthDecision::Allow => {
            if let Some(session) = session {
                request
                    .extensions_mut()
                    .insert(CurrentUser(session.user.clone()));
            }
            next.run(request).await
        }
        AuthDecision::Redirect(target) => {
            if state.gate.is_api_path(&path) {
                // Redirects are meaningless for machine consumers
                deny_response(
                    StatusCode::UNAUTHORIZED,
                    "authentication_required",
                    "Authentication is required for this resource",
                )
            } else {
                debug!(path, target, "redirecting per route authorization");
                Redirect::temporary(&target).into_response()
            }
        }
        AuthDecision::Deny => deny_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Access to this resource is denied",
        ),
    }
}

/// Load the current session and keep it fresh.
///
/// Every failure path degrades to "not logged in": decode problems are
/// absorbed by the store, and refresh failures are recovered here. A
/// rejected refresh token has already cleared the persisted state by
/// the time the error reaches us.
async fn resolve_session(state: &AppState) -> Option<Session> {
    let session = state.store.load().await?;
    match state.coordinator.ensure_fresh(&session).await {
        Ok(fresh) => Some(fresh),
        Err(e) => {
            warn!("session refresh failed, treating request as logged out: {}", e);
            None
        }
    }
}

fn deny_response(status: StatusCode, error_code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error_code,
            "message": message,
        })),
    )
        .into_response()
}

/// Rejection for handlers that require an authenticated user
#[derive(Debug)]
pub enum AuthRejection {
    /// Browser consumers are sent to the login page
    Redirect(String),
    /// API consumers get a JSON 401, never a redirect
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Redirect(target) => Redirect::temporary(&target).into_response(),
            AuthRejection::Unauthorized => deny_response(
                StatusCode::UNAUTHORIZED,
                "authentication_required",
                "Authentication is required for this resource",
            ),
        }
    }
}

/// Extractor for the user projection placed by the middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProjection);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        if state.gate.is_api_path(parts.uri.path()) {
            Err(AuthRejection::Unauthorized)
        } else {
            Err(AuthRejection::Redirect(
                state.config.routes.login_path.clone(),
            ))
        }
    }
}
