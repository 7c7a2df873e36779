use axum::{Json, extract::State, response::IntoResponse};
use tracing::instrument;

use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;

use super::service::DashboardService;

/// Admin dashboard summary
#[utoipa::path(
    get,
    path = "/api/dashboards/admin",
    tag = "Dashboards",
    responses((status = 200, description = "Counts and recent registrations")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn admin_summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let dashboard = DashboardService::admin_summary(&state.db).await?;
    Ok(Json(ApiResponse::ok("Dashboard fetched successfully", dashboard)))
}

/// Student counts per school
#[utoipa::path(
    get,
    path = "/api/dashboards/students-per-school",
    tag = "Dashboards",
    responses((status = 200, description = "Student count for every school")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn students_per_school(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = DashboardService::students_per_school(&state.db).await?;
    Ok(Json(ApiResponse::ok("Student counts fetched successfully", rows)))
}

/// Teacher counts per school
#[utoipa::path(
    get,
    path = "/api/dashboards/teachers-per-school",
    tag = "Dashboards",
    responses((status = 200, description = "Teacher count for every school")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn teachers_per_school(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = DashboardService::teachers_per_school(&state.db).await?;
    Ok(Json(ApiResponse::ok("Teacher counts fetched successfully", rows)))
}

/// Class utilization percentages
#[utoipa::path(
    get,
    path = "/api/dashboards/class-utilization",
    tag = "Dashboards",
    responses((status = 200, description = "Enrollment vs capacity per class")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn class_utilization(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = DashboardService::class_utilization(&state.db).await?;
    Ok(Json(ApiResponse::ok("Class utilization fetched successfully", rows)))
}

/// Monthly registration counts
#[utoipa::path(
    get,
    path = "/api/dashboards/recent-registrations",
    tag = "Dashboards",
    responses((status = 200, description = "Registrations per month, last six months")),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn recent_registrations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let rows = DashboardService::recent_registrations(&state.db).await?;
    Ok(Json(ApiResponse::ok(
        "Recent registrations fetched successfully",
        rows,
    )))
}
