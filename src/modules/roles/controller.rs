use axum::extract::{Path, State};
use axum::response::Response;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{CreateRoleDto, Role, RoleWithUserCount};
use super::service::RoleService;

#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Roles with user counts", body = [RoleWithUserCount])
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_all_roles(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<ApiResponse<Vec<RoleWithUserCount>>, AppError> {
    let roles = RoleService::get_all_roles_with_user_count(&state.db).await?;
    Ok(ApiResponse::ok("Roles fetched successfully.", roles))
}

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth_user))]
pub async fn create_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<ApiResponse<Role>, AppError> {
    let role = RoleService::create_role(&state.db, dto).await?;
    Ok(ApiResponse::created("Role created successfully.", role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}",
    params(("role_id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 404, description = "Role not found"),
        (status = 412, description = "Role still has users")
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(role_id): Path<i64>,
) -> Result<Response, AppError> {
    RoleService::delete_role(&state.db, role_id).await?;
    Ok(message_response("Role deleted successfully."))
}
