use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
};
use super::service::AuthService;

/// Register a new user
///
/// Accounts start INACTIVE and unverified.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 409, description = "Email already taken"),
        (status = 422, description = "Validation error or invalid role ids"),
    )
)]
#[instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::register(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("User registered successfully", user)),
    ))
}

/// Log in
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response =
        AuthService::login(&state.db, &state.jwt_config, &req.email, &req.password).await?;
    Ok(Json(ApiResponse::ok("Login successful", response)))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent"),
        (status = 404, description = "No user with this email"),
    )
)]
#[instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    AuthService::request_password_reset(&state.db, &state.email, &req.email).await?;
    Ok(message_response("Password reset link sent"))
}

/// Reset a password with a token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired token"),
    )
)]
#[instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    AuthService::reset_password_with_token(&state.db, &state.email, req).await?;
    Ok(message_response("Password has been reset successfully"))
}
