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

use super::model::{AssignTeacherDto, CreateClassDto, UpdateClassDto};
use super::service::ClassService;

/// Create a new class
///
/// Also links the optional teacher and enrolls the supplied students,
/// marking the class as each one's main class.
#[utoipa::path(
    post,
    path = "/api/classes",
    tag = "Classes",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created"),
        (status = 404, description = "School not found"),
        (status = 409, description = "Class code already taken"),
        (status = 422, description = "Validation or reference error"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_class(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<impl IntoResponse, AppError> {
    let class = ClassService::create_class(&state.db, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Class created successfully", class)),
    ))
}

/// List all classes
#[utoipa::path(
    get,
    path = "/api/classes",
    tag = "Classes",
    responses((status = 200, description = "All classes with relations")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_all_classes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let classes = ClassService::get_all_classes(&state.db).await?;
    Ok(Json(ApiResponse::ok("Classes fetched successfully", classes)))
}

/// Get a class by ID
#[utoipa::path(
    get,
    path = "/api/classes/{class_id}",
    tag = "Classes",
    params(("class_id" = i64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class found"),
        (status = 404, description = "Class not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let class = ClassService::get_class_by_id(&state.db, class_id).await?;
    Ok(Json(ApiResponse::ok("Class fetched successfully", class)))
}

/// List classes of a school
#[utoipa::path(
    get,
    path = "/api/classes/school/{school_id}",
    tag = "Classes",
    params(("school_id" = i64, Path, description = "School ID")),
    responses((status = 200, description = "Classes of the school")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_classes_by_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let classes = ClassService::get_classes_by_school(&state.db, school_id).await?;
    Ok(Json(ApiResponse::ok("Classes fetched successfully", classes)))
}

/// Assign a teacher to a class
#[utoipa::path(
    post,
    path = "/api/classes/{class_id}/teacher",
    tag = "Classes",
    params(("class_id" = i64, Path, description = "Class ID")),
    request_body = AssignTeacherDto,
    responses(
        (status = 200, description = "Teacher assigned"),
        (status = 404, description = "Class not found"),
        (status = 422, description = "User is not a teacher"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn assign_teacher(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<AssignTeacherDto>,
) -> Result<impl IntoResponse, AppError> {
    ClassService::assign_teacher_to_class(&state.db, class_id, dto.teacher_id).await?;
    Ok(message_response("Teacher assigned to class successfully"))
}

/// Update a class
#[utoipa::path(
    put,
    path = "/api/classes/{class_id}",
    tag = "Classes",
    params(("class_id" = i64, Path, description = "Class ID")),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated"),
        (status = 404, description = "Class or school not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, patch))]
pub async fn update_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateClassDto>,
) -> Result<impl IntoResponse, AppError> {
    let class = ClassService::update_class(&state.db, class_id, patch).await?;
    Ok(Json(ApiResponse::ok("Class updated successfully", class)))
}

/// Delete a class
#[utoipa::path(
    delete,
    path = "/api/classes/{class_id}",
    tag = "Classes",
    params(("class_id" = i64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 404, description = "Class not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ClassService::delete_class(&state.db, class_id).await?;
    Ok(message_response("Class deleted successfully"))
}
