use axum::{Router, routing::get};

use crate::modules::dashboards::controller::{
    admin_summary, class_utilization, recent_registrations, students_per_school,
    teachers_per_school,
};
use crate::state::AppState;

pub fn init_dashboards_router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_summary))
        .route("/students-per-school", get(students_per_school))
        .route("/teachers-per-school", get(teachers_per_school))
        .route("/class-utilization", get(class_utilization))
        .route("/recent-registrations", get(recent_registrations))
}
