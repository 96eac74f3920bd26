use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::product::{
    create_product, dashboard, delete_product, get_product, list_all_products, list_categories,
    list_public_products, toggle_product, update_product,
};
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_public_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/categories", get(list_categories))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/products", get(list_all_products).post(create_product))
        .route("/admin/products/{id}", get(get_product).put(update_product).delete(delete_product))
        .route("/admin/products/{id}/toggle", post(toggle_product))
}
