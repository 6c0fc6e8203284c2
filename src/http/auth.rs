/// Authentication handlers
///
/// Each handler is a linear pipeline with early exit on first failure:
/// request-shape validation, then the service call, then the response
/// with a token and the public user projection.
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::{AuthError, Result};
use crate::models::user::{
    LoginBody, PublicUser, RegisterBody, RequestOtpBody, UpdatePushTokenBody, VerifyOtpBody,
};

use super::{AppState, CurrentUser};

/// OTP request acknowledgement
#[derive(Debug, Serialize)]
pub struct OtpRequestedResponse {
    pub message: String,
    #[serde(rename = "isNewUser")]
    pub is_new_user: bool,
}

/// Token + public user, returned by every login-shaped protocol
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Extract a required, non-empty string field
fn require<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::Validation(message.to_string())),
    }
}

/// POST /auth/request-otp
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpBody>,
) -> Result<impl IntoResponse> {
    let phone = require(&body.phone, "Phone number is required")?;

    let outcome = state.phone_auth.request_otp(phone).await?;

    Ok(Json(OtpRequestedResponse {
        message: "OTP sent successfully".to_string(),
        is_new_user: outcome.is_new_user,
    }))
}

/// POST /auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<impl IntoResponse> {
    let phone = require(&body.phone, "Phone number and OTP are required")?;
    let otp = require(&body.otp, "Phone number and OTP are required")?;

    let result = state.phone_auth.verify_otp(phone, otp).await?;

    Ok(Json(AuthResponse {
        token: result.token,
        user: PublicUser::from(&result.user),
    }))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse> {
    let email = require(&body.email, "All fields are required")?;
    let username = require(&body.username, "All fields are required")?;
    let password = require(&body.password, "All fields are required")?;

    let result = state.email_auth.register(email, username, password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: result.token,
            user: PublicUser::from(&result.user),
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse> {
    let email = require(&body.email, "All fields are required")?;
    let password = require(&body.password, "All fields are required")?;

    let result = state.email_auth.login(email, password).await?;

    Ok(Json(AuthResponse {
        token: result.token,
        user: PublicUser::from(&result.user),
    }))
}

/// PUT /auth/update-expo-token (authenticated)
pub async fn update_expo_token(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<UpdatePushTokenBody>,
) -> Result<impl IntoResponse> {
    let push_token = require(&body.expo_push_token, "Expo push token is required")?;

    let updated = state.repo.update_push_token(user.id, push_token).await?;
    if !updated {
        return Err(AuthError::UserNotFound);
    }

    Ok(Json(MessageResponse {
        message: "Push token updated successfully".to_string(),
    }))
}
