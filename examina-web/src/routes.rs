//! Route definitions
//!
//! Every route is registered here, and the authorization middleware is
//! layered over the whole router so no path can opt out of it. Which
//! routes are public, guarded, or role-restricted is decided by the
//! route rules in configuration, not by where a handler is mounted.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware, AppState};

/// Build the full application router with authorization applied
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_page))
        .route("/onboarding", get(handlers::onboarding))
        .route("/student/dashboard", get(handlers::dashboard))
        .route("/teacher/dashboard", get(handlers::dashboard))
        .route("/institution/dashboard", get(handlers::dashboard))
        // Auth API
        .route("/api/auth/sign-in", post(handlers::sign_in))
        .route("/api/auth/sign-out", post(handlers::sign_out))
        .route("/api/auth/me", get(handlers::current_user))
        // Role-restricted API
        .route("/api/v1/teacher/courses", get(handlers::teacher_courses))
        .layer(from_fn_with_state(state.clone(), middleware::authorize))
        .with_state(state)
}
