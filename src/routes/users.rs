use axum::{Router, routing::{post, get}};
use crate::state::AppState;
use crate::handlers::user::{change_password, get_me, login_user, logout_user};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login_user))
        .route("/admin/logout", post(logout_user))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/me", get(get_me))
        .route("/admin/password", post(change_password))
}
