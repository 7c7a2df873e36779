use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{AssignClassesDto, RegisterTeacherDto, UpdateTeacherDto};
use super::service::TeacherService;

/// Register a new teacher
///
/// Creates the account with a generated password and emails the
/// credentials to the teacher.
#[utoipa::path(
    post,
    path = "/api/teachers",
    tag = "Teachers",
    request_body = RegisterTeacherDto,
    responses(
        (status = 201, description = "Teacher registered"),
        (status = 404, description = "School not found"),
        (status = 409, description = "Email already taken"),
        (status = 422, description = "Validation error"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn register_teacher(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterTeacherDto>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = TeacherService::register_teacher(&state.db, &state.email, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Teacher registered successfully", teacher)),
    ))
}

/// List all teachers
#[utoipa::path(
    get,
    path = "/api/teachers",
    tag = "Teachers",
    responses((status = 200, description = "All teachers")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_all_teachers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let teachers = TeacherService::get_all_teachers(&state.db).await?;
    Ok(Json(ApiResponse::ok("Teachers fetched successfully", teachers)))
}

/// List teachers of a school
#[utoipa::path(
    get,
    path = "/api/teachers/school/{school_id}",
    tag = "Teachers",
    params(("school_id" = i64, Path, description = "School ID")),
    responses((status = 200, description = "Teachers linked to the school")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teachers_by_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teachers = TeacherService::get_teachers_by_school(&state.db, school_id).await?;
    Ok(Json(ApiResponse::ok("Teachers fetched successfully", teachers)))
}

/// Get a teacher by ID
#[utoipa::path(
    get,
    path = "/api/teachers/{teacher_id}",
    tag = "Teachers",
    params(("teacher_id" = i64, Path, description = "Teacher user ID")),
    responses(
        (status = 200, description = "Teacher found"),
        (status = 404, description = "Teacher not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = TeacherService::get_teacher_by_id(&state.db, teacher_id).await?;
    Ok(Json(ApiResponse::ok("Teacher fetched successfully", teacher)))
}

/// Assign a teacher to several classes
#[utoipa::path(
    post,
    path = "/api/teachers/assign-classes",
    tag = "Teachers",
    request_body = AssignClassesDto,
    responses(
        (status = 200, description = "Classes assigned"),
        (status = 404, description = "Teacher not found"),
        (status = 422, description = "Unknown class ids or wrong school"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn assign_teacher_to_classes(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<AssignClassesDto>,
) -> Result<impl IntoResponse, AppError> {
    TeacherService::assign_teacher_to_classes(&state.db, dto).await?;
    Ok(message_response("Teacher assigned to classes successfully"))
}

/// Update a teacher
#[utoipa::path(
    put,
    path = "/api/teachers/{teacher_id}",
    tag = "Teachers",
    params(("teacher_id" = i64, Path, description = "Teacher user ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Email already taken"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, patch))]
pub async fn update_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateTeacherDto>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = TeacherService::update_teacher(&state.db, teacher_id, patch).await?;
    Ok(Json(ApiResponse::ok("Teacher updated successfully", teacher)))
}

/// Delete a teacher
#[utoipa::path(
    delete,
    path = "/api/teachers/{teacher_id}",
    tag = "Teachers",
    params(("teacher_id" = i64, Path, description = "Teacher user ID")),
    responses(
        (status = 200, description = "Teacher deleted"),
        (status = 404, description = "Teacher not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    TeacherService::delete_teacher(&state.db, teacher_id).await?;
    Ok(message_response("Teacher deleted successfully"))
}
