use axum::{extract::DefaultBodyLimit, routing::post, Router};
use crate::handlers::media::upload_media;
use crate::media::{MAX_FILES_PER_UPLOAD, MAX_MEDIA_BYTES};
use crate::state::AppState;

/// Room for a full batch plus multipart framing; each file is capped
/// separately while it streams to disk.
const UPLOAD_BODY_LIMIT: usize = MAX_FILES_PER_UPLOAD * MAX_MEDIA_BYTES + 1024 * 1024;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/media", post(upload_media))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}
