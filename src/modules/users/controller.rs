use axum::extract::{Path, Query, State};
use axum::response::Response;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationParams;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{PaginatedUsersResponse, UpdateUserProfileDto, UserDto, VerifyUserDto};
use super::service::UserService;

#[utoipa::path(
    get,
    path = "/api/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedUsersResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_all_users(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<ApiResponse<PaginatedUsersResponse>, AppError> {
    let (users, meta) = UserService::get_all_users(&state.db, &params).await?;
    Ok(ApiResponse::ok(
        "Users fetched successfully.",
        PaginatedUsersResponse { users, meta },
    ))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDto),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<UserDto>, AppError> {
    let user = UserService::get_user_by_id(&state.db, user_id).await?;
    Ok(ApiResponse::ok("User fetched successfully.", user))
}

#[utoipa::path(
    patch,
    path = "/api/users/{user_id}/verify",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body = VerifyUserDto,
    responses(
        (status = 200, description = "Verification flag updated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth_user))]
pub async fn verify_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<i64>,
    axum::Json(dto): axum::Json<VerifyUserDto>,
) -> Result<Response, AppError> {
    let is_verified = dto.is_verified.unwrap_or(true);
    UserService::verify_user_by_id(&state.db, user_id, is_verified).await?;
    Ok(message_response("User verification updated successfully."))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}/profile",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body = UpdateUserProfileDto,
    responses(
        (status = 200, description = "Profile updated", body = UserDto),
        (status = 404, description = "User not found"),
        (status = 409, description = "Phone number already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth_user, dto))]
pub async fn update_user_profile(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(user_id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<UpdateUserProfileDto>,
) -> Result<ApiResponse<UserDto>, AppError> {
    let user = UserService::update_user_profile(&state.db, user_id, dto).await?;
    Ok(ApiResponse::ok("User profile updated successfully.", user))
}
