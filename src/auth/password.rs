use bcrypt::{hash, verify};
use crate::error::AppError;

/// Fixed bcrypt work factor for every stored credential.
pub const BCRYPT_COST: u32 = 10;

/// Credentials written before hashing was introduced are plain text; a
/// bcrypt hash always carries one of these prefixes.
pub fn is_bcrypt_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"].iter().any(|p| stored.starts_with(p))
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Hash task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::internal(format!("Verify task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hashed = hash_password("admin123").await.unwrap();
        assert!(is_bcrypt_hash(&hashed));
        assert_ne!(hashed, "admin123");
        assert!(verify_password("admin123", &hashed).await.unwrap());
        assert!(!verify_password("admin124", &hashed).await.unwrap());
    }

    #[test]
    fn plain_text_is_not_a_hash() {
        assert!(!is_bcrypt_hash("admin123"));
        assert!(is_bcrypt_hash("$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy"));
    }
}
