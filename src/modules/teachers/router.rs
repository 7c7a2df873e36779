use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::modules::teachers::controller::{
    assign_teacher_to_classes, delete_teacher, get_all_teachers, get_teacher,
    get_teachers_by_school, register_teacher, update_teacher,
};
use crate::state::AppState;

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_teachers).post(register_teacher))
        .route("/assign-classes", post(assign_teacher_to_classes))
        .route("/school/{school_id}", get(get_teachers_by_school))
        .route("/{teacher_id}", get(get_teacher))
        .route("/{teacher_id}", put(update_teacher))
        .route("/{teacher_id}", delete(delete_teacher))
}
