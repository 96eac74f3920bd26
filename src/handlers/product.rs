// src/handlers/product.rs
use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use crate::dtos::product::{CategoryQuery, DashboardStats, ProductResponse};
use crate::models::product::{categories, Category, CategoryFilter, CategoryInfo, NewProduct, ProductPatch};
use crate::state::AppState;
use crate::store::ProductRepository;
use crate::error::AppError;
use tracing::{info, instrument};

fn responses(products: Vec<crate::models::product::Product>) -> Vec<ProductResponse> {
    products.into_iter().map(ProductResponse::from).collect()
}

// GET /api/products - Public catalog (active products only)
#[instrument(skip(state))]
pub async fn list_public_products(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let filter = CategoryFilter::parse(query.category.as_deref());
    let products = state.store.list_public(filter).await?;
    Ok(Json(responses(products)))
}

// GET /api/products/{id} and /admin/products/{id} - Single product
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .store
        .find_product(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Produto não encontrado"))?;

    Ok(Json(ProductResponse::from(product)))
}

// GET /api/categories
pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(categories())
}

// GET /admin/products - Admin listing, inactive included
#[instrument(skip(state))]
pub async fn list_all_products(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let filter = CategoryFilter::parse(query.category.as_deref());
    let products = state.store.list_all(filter).await?;
    Ok(Json(responses(products)))
}

// POST /admin/products - Create new product
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let Json(payload) = payload?;
    let draft = payload.validate()?;
    let product = state.store.create_product(draft).await?;
    info!(id = %product.id, name = %product.name, "Product created");

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /admin/products/{id} - Update product
#[instrument(skip(state, payload))]
pub async fn update_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    let Json(payload) = payload?;
    let product = state.store.update_product(&id, payload).await?;
    info!(id = %product.id, "Product updated");

    Ok(Json(ProductResponse::from(product)))
}

// POST /admin/products/{id}/toggle - Flip visibility
#[instrument(skip(state))]
pub async fn toggle_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state.store.toggle_active(&id).await?;
    info!(id = %product.id, active = product.active, "Product visibility changed");

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /admin/products/{id} - Delete product
#[instrument(skip(state))]
pub async fn delete_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.store.delete_product(&id).await?;
    info!(%id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}

// GET /admin/dashboard - Catalog counters
#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let products = state.store.list_all(CategoryFilter::All).await?;
    let in_category = |c: Category| products.iter().filter(|p| p.category == c).count();

    Ok(Json(DashboardStats {
        total_products: products.len(),
        fitness_products: in_category(Category::Fitness),
        suplementos_products: in_category(Category::Suplementos),
        active_products: products.iter().filter(|p| p.active).count(),
    }))
}
