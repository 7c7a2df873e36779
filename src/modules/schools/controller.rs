use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{CreateSchoolDto, UpdateSchoolDto};
use super::service::SchoolService;

/// Create a new school
///
/// Registers a school. When `manager_id` is omitted a school manager
/// account is created automatically and its credentials are emailed.
#[utoipa::path(
    post,
    path = "/api/schools",
    tag = "Schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created"),
        (status = 409, description = "Duplicate school unique id"),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_school(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<impl IntoResponse, AppError> {
    let school = SchoolService::create_school(&state.db, &state.email, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("School created successfully", school)),
    ))
}

/// List all schools
#[utoipa::path(
    get,
    path = "/api/schools",
    tag = "Schools",
    responses((status = 200, description = "All schools with their managers")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_all_schools(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let schools = SchoolService::get_all_schools(&state.db).await?;
    Ok(Json(ApiResponse::ok("Schools fetched successfully", schools)))
}

/// Get a school by ID
#[utoipa::path(
    get,
    path = "/api/schools/{school_id}",
    tag = "Schools",
    params(("school_id" = i64, Path, description = "School ID")),
    responses(
        (status = 200, description = "School found"),
        (status = 404, description = "School not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let school = SchoolService::get_school_by_id(&state.db, school_id).await?;
    Ok(Json(ApiResponse::ok("School fetched successfully", school)))
}

/// Update a school
///
/// Applies the provided fields only; omitted fields are left unchanged.
#[utoipa::path(
    put,
    path = "/api/schools/{school_id}",
    tag = "Schools",
    params(("school_id" = i64, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated"),
        (status = 404, description = "School not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, patch))]
pub async fn update_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateSchoolDto>,
) -> Result<impl IntoResponse, AppError> {
    let school = SchoolService::update_school(&state.db, school_id, patch).await?;
    Ok(Json(ApiResponse::ok("School updated successfully", school)))
}

/// Delete a school
///
/// Fails with 412 while the school still owns classes or has students or
/// employees registered to it.
#[utoipa::path(
    delete,
    path = "/api/schools/{school_id}",
    tag = "Schools",
    params(("school_id" = i64, Path, description = "School ID")),
    responses(
        (status = 200, description = "School deleted"),
        (status = 404, description = "School not found"),
        (status = 412, description = "School still owns classes, students or employees"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    SchoolService::delete_school(&state.db, school_id).await?;
    Ok(message_response("School deleted successfully"))
}

/// Users of the caller's school grouped by role
///
/// Only available to users registered as a school manager.
#[utoipa::path(
    get,
    path = "/api/schools/users-by-role",
    tag = "Schools",
    responses(
        (status = 200, description = "Teachers, students, parents and managers of the school"),
        (status = 403, description = "Caller is not a school manager"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth))]
pub async fn get_school_users_by_role(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let caller_id = auth.user_id()?;
    let grouped = SchoolService::get_school_users_by_role(&state.db, caller_id).await?;
    Ok(Json(ApiResponse::ok(
        "School users fetched successfully",
        grouped,
    )))
}
