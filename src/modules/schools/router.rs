use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::modules::schools::controller::{
    create_school, delete_school, get_all_schools, get_school, get_school_users_by_role,
    update_school,
};
use crate::state::AppState;

/// School mutations, restricted to admins at the top-level router.
pub fn init_schools_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_school))
        .route("/{school_id}", put(update_school))
        .route("/{school_id}", delete(delete_school))
}

/// School reads, available to any authenticated user.
pub fn init_schools_read_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_schools))
        .route("/users-by-role", get(get_school_users_by_role))
        .route("/{school_id}", get(get_school))
}
