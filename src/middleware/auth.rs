use axum::{response::{Response, IntoResponse}};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use crate::auth::jwt::verify_token;
use crate::models::user::ADMIN_ROLE;
use crate::state::AppState;
use serde::Serialize;

pub const SESSION_COOKIE: &str = "mm_session";

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: String,
    pub role: String,
    pub username: String,
}

#[derive(Serialize)]
struct ErrorBody { error: String, code: &'static str }

use axum::http::Request;

/// Session gate for admin routes: accepts `Authorization: Bearer <token>`
/// or the session cookie set at login.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match session_token(req.headers()) {
        Some(t) => t,
        None => return unauthorized("Login necessário"),
    };

    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return unauthorized("Sessão inválida ou expirada"),
    };

    if claims.role != ADMIN_ROLE {
        let body = axum::Json(ErrorBody {
            error: "Você não tem permissão para acessar esta página".to_string(),
            code: "forbidden",
        });
        return (StatusCode::FORBIDDEN, body).into_response();
    }

    // Attach context
    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
        username: claims.username,
    });

    next.run(req).await
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return auth.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn unauthorized(msg: &str) -> Response {
    let body = axum::Json(ErrorBody { error: msg.to_string(), code: "unauthorized" });
    (StatusCode::UNAUTHORIZED, body).into_response()
}
