use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::modules::students::controller::{
    activate_student, connect_student_with_parents, create_student, deactivate_student,
    delete_student, get_all_students, get_student, get_students_by_class,
    get_students_by_school, get_students_with_medical_conditions, update_student,
};
use crate::state::AppState;

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student))
        .route("/all", get(get_all_students))
        .route("/medical-conditions", get(get_students_with_medical_conditions))
        .route("/school/{school_id}", get(get_students_by_school))
        .route("/class/{class_id}", get(get_students_by_class))
        .route("/{student_id}", get(get_student))
        .route("/{student_id}", put(update_student))
        .route("/{student_id}", delete(delete_student))
        .route("/{student_id}/activate", patch(activate_student))
        .route("/{student_id}/deactivate", patch(deactivate_student))
        .route("/{student_id}/parents", post(connect_student_with_parents))
}
