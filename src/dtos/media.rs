use serde::Serialize;

/// References of the stored uploads, split the way product payloads use them.
#[derive(Debug, Default, Serialize)]
pub struct UploadResponse {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}
