use axum::{
    Router,
    routing::{delete, get},
};

use crate::modules::roles::controller::{create_role, delete_role, get_all_roles};
use crate::state::AppState;

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_roles).post(create_role))
        .route("/{role_id}", delete(delete_role))
}
