use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::modules::classes::controller::{
    assign_teacher, create_class, delete_class, get_all_classes, get_class,
    get_classes_by_school, update_class,
};
use crate::state::AppState;

pub fn init_classes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_classes).post(create_class))
        .route("/school/{school_id}", get(get_classes_by_school))
        .route("/{class_id}", get(get_class))
        .route("/{class_id}", put(update_class))
        .route("/{class_id}", delete(delete_class))
        .route("/{class_id}/teacher", post(assign_teacher))
}
