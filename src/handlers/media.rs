use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{instrument, warn};

use crate::dtos::media::UploadResponse;
use crate::error::AppError;
use crate::media::{LocalMediaStore, MediaKind, MediaUpload, StoredMedia, MAX_FILES_PER_UPLOAD, MAX_MEDIA_BYTES};
use crate::state::AppState;

pub const MEDIA_FIELD: &str = "media";

// POST /admin/media - multipart upload, field `media`
#[instrument(skip(state, multipart))]
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut stored = Vec::new();
    if let Err(e) = receive_files(&state.media, &mut multipart, &mut stored).await {
        // the client never sees these references
        state.media.remove(&stored).await;
        return Err(e);
    }

    if stored.is_empty() {
        return Err(AppError::validation("Nenhum arquivo enviado"));
    }

    let mut response = UploadResponse::default();
    for media in stored {
        match media.kind {
            MediaKind::Image => response.images.push(media.url),
            MediaKind::Video => response.videos.push(media.url),
        }
    }
    Ok(Json(response))
}

async fn receive_files(
    media: &LocalMediaStore,
    multipart: &mut Multipart,
    stored: &mut Vec<StoredMedia>,
) -> Result<(), AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(MEDIA_FIELD) {
            continue;
        }
        if stored.len() == MAX_FILES_PER_UPLOAD {
            return Err(AppError::validation(format!(
                "Máximo de {MAX_FILES_PER_UPLOAD} arquivos por envio"
            )));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let mut upload = media.begin(&filename, content_type.as_deref()).await?;

        if let Err(e) = copy_field(&mut field, &mut upload).await {
            upload.abort().await;
            return Err(e);
        }
        stored.push(upload.finish().await?);
    }
    Ok(())
}

async fn copy_field(field: &mut Field<'_>, upload: &mut MediaUpload) -> Result<(), AppError> {
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        upload.write(&chunk).await?;
    }
    Ok(())
}

fn multipart_error(e: MultipartError) -> AppError {
    warn!(error = %e, "Rejected upload body");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::MediaTooLarge(format!(
            "Arquivos devem ter no máximo {} MB",
            MAX_MEDIA_BYTES / (1024 * 1024)
        ))
    } else {
        AppError::validation(e.body_text())
    }
}
