use axum::{
    Router,
    routing::{get, patch, put},
};

use crate::modules::users::controller::{
    get_all_users, get_user, update_user_profile, verify_user,
};
use crate::state::AppState;

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_users))
        .route("/{user_id}", get(get_user))
        .route("/{user_id}/verify", patch(verify_user))
        .route("/{user_id}/profile", put(update_user_profile))
}
