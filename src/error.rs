// src/error.rs
use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

/// Shown for both unknown usernames and wrong passwords so logins cannot
/// be used to enumerate accounts.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Usuário ou senha incorretos";

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    Storage(String),
    Unauthorized,
    NotFound(String),
    ValidationError(String),
    UserNotFound,
    InvalidCredential,
    UnsupportedMedia(String),
    MediaTooLarge(String),
    Internal(String),
}

impl AppError {
    pub fn db(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "database error: {e}"),
            AppError::Storage(msg) => write!(f, "storage error: {msg}"),
            AppError::Unauthorized => f.write_str("unauthorized"),
            AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::UnsupportedMedia(msg)
            | AppError::MediaTooLarge(msg) => f.write_str(msg),
            AppError::UserNotFound => f.write_str("user not found"),
            AppError::InvalidCredential => f.write_str("invalid credential"),
            AppError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "Database unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Serviço temporariamente indisponível",
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Data file unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Serviço temporariamente indisponível",
                )
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Acesso não autorizado"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::UserNotFound | AppError::InvalidCredential => {
                (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE)
            }
            AppError::UnsupportedMedia(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.as_str()),
            AppError::MediaTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.as_str()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Algo deu errado!")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

/// Malformed or incomplete request bodies are reported like any other
/// validation failure; the serde detail only goes to the log.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(detail = %rejection.body_text(), "Rejected JSON body");
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::validation("Envie o corpo da requisição como JSON")
            }
            JsonRejection::JsonSyntaxError(_) => AppError::validation("JSON inválido no corpo da requisição"),
            _ => AppError::validation("Dados inválidos ou campos obrigatórios ausentes"),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
