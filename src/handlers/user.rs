use axum::extract::Extension;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use chrono::Duration;
use tracing::{instrument, warn};

use crate::auth::{self, jwt::sign_token};
use crate::dtos::user::{ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse};
use crate::error::AppError;
use crate::middleware::auth::{AuthContext, SESSION_COOKIE};
use crate::models::user::PublicUser;
use crate::state::AppState;

fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| AppError::internal(format!("Bad cookie value: {e}")))
}

// POST /admin/login
#[instrument(skip(state, payload))]
pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    let Json(payload) = payload?;
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Usuário é obrigatório"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Senha é obrigatória"));
    }

    let user = auth::login(state.store.as_ref(), &payload.username, &payload.password)
        .await
        .inspect_err(|e| warn!(username = %payload.username, reason = %e, "Login rejected"))?;

    let ttl = Duration::hours(state.config.session_ttl_hours);
    let token = sign_token(&user, &state.config.jwt_secret, ttl)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&token, ttl.num_seconds(), state.config.cookie_secure)?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            user,
            access_token: token,
            token_type: "Bearer",
            expires_in_seconds: ttl.num_seconds(),
        }),
    ))
}

// POST /admin/logout
pub async fn logout_user(State(state): State<AppState>) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0, state.config.cookie_secure)?);
    Ok((headers, Json(MessageResponse { message: "Sessão encerrada" })))
}

// GET /admin/me - profile of the logged-in admin
pub async fn get_me(
    State(state): State<AppState>,
    Extension(session): Extension<AuthContext>,
) -> Result<Json<PublicUser>, AppError> {
    let user = auth::get_user(state.store.as_ref(), &session.user_id).await?;
    Ok(Json(user))
}

// POST /admin/password
#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<AuthContext>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    if payload.new_password != payload.confirm_password {
        return Err(AppError::validation("As senhas não coincidem"));
    }

    auth::change_password(
        state.store.as_ref(),
        &session.user_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await
    .map_err(|e| match e {
        AppError::InvalidCredential => AppError::validation("Senha atual incorreta"),
        other => other,
    })?;

    Ok(Json(MessageResponse { message: "Senha alterada com sucesso" }))
}
