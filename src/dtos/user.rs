use serde::{Deserialize, Serialize};

use crate::models::user::PublicUser;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_seconds: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
