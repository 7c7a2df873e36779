use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::{ApiResponse, message_response};
use crate::validator::ValidatedJson;

use super::model::{ConnectParentsDto, CreateStudentDto, UpdateStudentDto};
use super::service::StudentService;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MedicalFilterParams {
    /// Restrict results to one school.
    pub school_id: Option<i64>,
}

/// Create a new student
///
/// Creates the user account, profile and student record, enrolls the
/// student into the given classes and links (or creates) the listed
/// parents, all atomically.
#[utoipa::path(
    post,
    path = "/api/students",
    tag = "Students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created"),
        (status = 404, description = "School not found"),
        (status = 409, description = "Email or student number already taken"),
        (status = 422, description = "Validation or reference error"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<impl IntoResponse, AppError> {
    let student = StudentService::create_student(&state.db, &state.email, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Student created successfully", student)),
    ))
}

/// List all students
#[utoipa::path(
    get,
    path = "/api/students/all",
    tag = "Students",
    responses((status = 200, description = "All students with relations")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_all_students(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let students = StudentService::get_all_students(&state.db).await?;
    Ok(Json(ApiResponse::ok("Students fetched successfully", students)))
}

/// Students with recorded medical conditions
#[utoipa::path(
    get,
    path = "/api/students/medical-conditions",
    tag = "Students",
    params(MedicalFilterParams),
    responses((status = 200, description = "Students with non-empty health notes")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_students_with_medical_conditions(
    State(state): State<AppState>,
    Query(params): Query<MedicalFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let students =
        StudentService::get_students_with_medical_conditions(&state.db, params.school_id).await?;
    Ok(Json(ApiResponse::ok("Students fetched successfully", students)))
}

/// Get a student by ID
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = StudentService::get_student_by_id(&state.db, student_id).await?;
    Ok(Json(ApiResponse::ok("Student fetched successfully", student)))
}

/// List students of a school
#[utoipa::path(
    get,
    path = "/api/students/school/{school_id}",
    tag = "Students",
    params(("school_id" = i64, Path, description = "School ID")),
    responses((status = 200, description = "Students of the school")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_students_by_school(
    State(state): State<AppState>,
    Path(school_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let students = StudentService::get_students_by_school(&state.db, school_id).await?;
    Ok(Json(ApiResponse::ok("Students fetched successfully", students)))
}

/// List students enrolled in a class
#[utoipa::path(
    get,
    path = "/api/students/class/{class_id}",
    tag = "Students",
    params(("class_id" = i64, Path, description = "Class ID")),
    responses((status = 200, description = "Students enrolled in the class")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_students_by_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let students = StudentService::get_students_by_class(&state.db, class_id).await?;
    Ok(Json(ApiResponse::ok("Students fetched successfully", students)))
}

/// Update a student
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Email or student number already taken"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, patch))]
pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateStudentDto>,
) -> Result<impl IntoResponse, AppError> {
    let student =
        StudentService::update_student(&state.db, &state.email, student_id, patch).await?;
    Ok(Json(ApiResponse::ok("Student updated successfully", student)))
}

/// Delete a student
///
/// Removes the student, their user account and any parents left with no
/// remaining children.
#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    StudentService::delete_student(&state.db, student_id).await?;
    Ok(message_response("Student deleted successfully"))
}

/// Activate a student's user account
#[utoipa::path(
    patch,
    path = "/api/students/{student_id}/activate",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student activated"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn activate_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    StudentService::activate_student(&state.db, student_id).await?;
    Ok(message_response("Student activated successfully"))
}

/// Deactivate a student's user account
#[utoipa::path(
    patch,
    path = "/api/students/{student_id}/deactivate",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deactivated"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn deactivate_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    StudentService::deactivate_student(&state.db, student_id).await?;
    Ok(message_response("Student deactivated successfully"))
}

/// Replace a student's parent links
#[utoipa::path(
    post,
    path = "/api/students/{student_id}/parents",
    tag = "Students",
    params(("student_id" = i64, Path, description = "Student ID")),
    request_body = ConnectParentsDto,
    responses(
        (status = 200, description = "Parent links replaced"),
        (status = 404, description = "Student not found"),
        (status = 422, description = "Unknown parent user ids"),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn connect_student_with_parents(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<ConnectParentsDto>,
) -> Result<impl IntoResponse, AppError> {
    StudentService::connect_student_with_parents(&state.db, student_id, dto).await?;
    Ok(message_response("Student parents updated successfully"))
}
