/// HTTP API for the identity service
///
/// axum router wiring the auth protocols plus the bearer middleware for
/// the one authenticated endpoint. Token issuance is the core concern;
/// verification-at-the-gate exists only to serve the push-token update.
mod auth;

pub use auth::*;

use crate::db::UserRepository;
use crate::error::AuthError;
use crate::models::User;
use crate::security::TokenIssuer;
use crate::services::{EmailAuthService, OtpStore, PhoneAuthService};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn UserRepository>,
    pub tokens: Arc<TokenIssuer>,
    pub phone_auth: PhoneAuthService,
    pub email_auth: EmailAuthService,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        otp_store: Arc<OtpStore>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            phone_auth: PhoneAuthService::new(repo.clone(), otp_store, tokens.clone()),
            email_auth: EmailAuthService::new(repo.clone(), tokens.clone()),
            repo,
            tokens,
        }
    }
}

/// Authenticated user resolved by the bearer middleware
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Build the HTTP router with all auth endpoints
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/update-expo-token", put(auth::update_expo_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Bearer authentication middleware
///
/// Decodes the session token, resolves the user, and injects it into the
/// request extensions for the handler.
async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidToken)?;

    let claims = state.tokens.decode(token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let user = state
        .repo
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
