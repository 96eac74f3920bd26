//! Product media uploads: classification, limits and local-disk storage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024;
pub const MAX_FILES_PER_UPLOAD: usize = 10;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

const ALLOWED_MESSAGE: &str =
    "Apenas imagens (jpeg, jpg, png, webp) e vídeos (mp4, webm, mov) são permitidos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Accepted upload: its kind and the extension it will be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: MediaKind,
    pub extension: String,
}

fn kind_of_extension(ext: &str) -> Option<MediaKind> {
    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime.split(';').next().unwrap_or_default().trim() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        _ => None,
    }
}

/// Validates an upload from its name alone, before any byte is read. The
/// file extension decides the kind; the MIME type is only consulted when
/// the name carries no extension.
pub fn classify(filename: &str, content_type: Option<&str>) -> Result<Classified, AppError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let extension = match extension {
        Some(ext) => ext,
        None => content_type
            .and_then(extension_for_mime)
            .map(str::to_string)
            .ok_or_else(|| AppError::UnsupportedMedia(ALLOWED_MESSAGE.to_string()))?,
    };
    let kind = kind_of_extension(&extension)
        .ok_or_else(|| AppError::UnsupportedMedia(ALLOWED_MESSAGE.to_string()))?;

    Ok(Classified { kind, extension })
}

fn too_large(filename: &str, limit: usize) -> AppError {
    AppError::MediaTooLarge(format!(
        "Arquivo '{filename}' excede o limite de {} MB",
        limit / (1024 * 1024)
    ))
}

/// A completely written upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub kind: MediaKind,
    pub url: String,
    path: PathBuf,
}

/// Writes uploads under `dir` and hands back references under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_bytes: MAX_MEDIA_BYTES,
        }
    }

    #[cfg(test)]
    fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Classifies the upload and opens its destination file. Nothing
    /// touches the disk when the name is rejected.
    pub async fn begin(&self, filename: &str, content_type: Option<&str>) -> Result<MediaUpload, AppError> {
        let Classified { kind, extension } = classify(filename, content_type)?;

        let stored_name = format!(
            "{}-{}.{extension}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4()
        );
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&stored_name);
        let file = File::create(&path).await?;

        Ok(MediaUpload {
            kind,
            original: filename.to_string(),
            url: format!("{}/{stored_name}", self.url_prefix),
            path,
            file,
            written: 0,
            limit: self.max_bytes,
        })
    }

    /// Deletes files from an upload request that did not complete.
    pub async fn remove(&self, stored: &[StoredMedia]) {
        for media in stored {
            if let Err(e) = tokio::fs::remove_file(&media.path).await {
                warn!(path = %media.path.display(), error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}

/// An upload being streamed to disk, capped at the store's size limit.
#[derive(Debug)]
pub struct MediaUpload {
    kind: MediaKind,
    original: String,
    url: String,
    path: PathBuf,
    file: File,
    written: usize,
    limit: usize,
}

impl MediaUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        if self.written + chunk.len() > self.limit {
            return Err(too_large(&self.original, self.limit));
        }
        self.file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredMedia, AppError> {
        let flushed = self.file.flush().await;
        if let Err(e) = flushed {
            self.abort().await;
            return Err(e.into());
        }
        info!(original = %self.original, url = %self.url, kind = ?self.kind, size = self.written, "Media stored");
        Ok(StoredMedia { kind: self.kind, url: self.url, path: self.path })
    }

    /// Drops the partial file.
    pub async fn abort(self) {
        let Self { file, path, .. } = self;
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert_eq!(classify("foto.JPG", None).unwrap().kind, MediaKind::Image);
        assert_eq!(classify("foto.webp", Some("image/webp")).unwrap().kind, MediaKind::Image);
        assert_eq!(classify("clip.mov", None).unwrap().kind, MediaKind::Video);
    }

    #[test]
    fn executable_is_unsupported() {
        let err = classify("setup.exe", Some("application/octet-stream")).unwrap_err();
        match err {
            AppError::UnsupportedMedia(msg) => {
                assert!(msg.contains("jpeg, jpg, png, webp"));
                assert!(msg.contains("mp4, webm, mov"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn known_extension_wins_over_mime() {
        let err = classify("virus.exe", Some("image/png")).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));
    }

    #[test]
    fn missing_extension_falls_back_to_mime() {
        let classified = classify("blob", Some("video/quicktime")).unwrap();
        assert_eq!(classified, Classified { kind: MediaKind::Video, extension: "mov".into() });
        assert!(classify("blob", None).is_err());
    }

    #[tokio::test]
    async fn streamed_upload_is_written_and_referenced() {
        let dir = TempDir::new().unwrap();
        let store = LocalMediaStore::new(dir.path().join("produtos"), "/img/produtos/");

        let mut upload = store.begin("Blusa.PNG", Some("image/png")).await.unwrap();
        upload.write(b"\x89P").await.unwrap();
        upload.write(b"NG").await.unwrap();
        let stored = upload.finish().await.unwrap();

        assert_eq!(stored.kind, MediaKind::Image);
        assert!(stored.url.starts_with("/img/produtos/"));
        assert!(stored.url.ends_with(".png"));

        let name = stored.url.rsplit('/').next().unwrap();
        let written = tokio::fs::read(dir.path().join("produtos").join(name)).await.unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn oversized_upload_stops_at_the_limit() {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("produtos");
        let store = LocalMediaStore::new(&uploads, "/img/produtos").with_max_bytes(4);

        let mut upload = store.begin("treino.mp4", Some("video/mp4")).await.unwrap();
        upload.write(b"abc").await.unwrap();
        let err = upload.write(b"de").await.unwrap_err();
        assert!(matches!(err, AppError::MediaTooLarge(_)));

        upload.abort().await;
        assert_eq!(files_in(&uploads), 0);
    }

    #[tokio::test]
    async fn rejected_name_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LocalMediaStore::new(dir.path().join("produtos"), "/img/produtos");
        assert!(store.begin("notes.txt", Some("text/plain")).await.is_err());
        assert!(!dir.path().join("produtos").exists());
    }

    #[tokio::test]
    async fn remove_deletes_completed_files() {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("produtos");
        let store = LocalMediaStore::new(&uploads, "/img/produtos");

        let mut stored = Vec::new();
        for name in ["a.jpg", "b.mp4"] {
            let mut upload = store.begin(name, None).await.unwrap();
            upload.write(b"data").await.unwrap();
            stored.push(upload.finish().await.unwrap());
        }
        assert_eq!(files_in(&uploads), 2);

        store.remove(&stored).await;
        assert_eq!(files_in(&uploads), 0);
    }
}
