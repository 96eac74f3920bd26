pub mod media;
pub mod products;
pub mod settings;
pub mod users;

use axum::{http::Method, middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .merge(products::public_routes())
        .merge(settings::public_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        );

    let admin = Router::new()
        .merge(products::admin_routes())
        .merge(settings::admin_routes())
        .merge(users::admin_routes())
        .merge(media::admin_routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(users::public_routes()).merge(admin)
}

/// Full application with state applied, as served by `main`.
pub fn app(state: AppState) -> Router {
    create_router(state.clone())
        .route("/", get(|| async { "Madame Modas API" }))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
