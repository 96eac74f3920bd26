use axum::{Router, routing::get};
use crate::state::AppState;
use crate::handlers::settings::{get_settings, update_settings};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/settings", get(get_settings).put(update_settings))
}
