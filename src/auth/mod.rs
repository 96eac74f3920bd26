//! Admin identity: login, password change and profile lookup on top of
//! whichever `Store` the process was started with.

pub mod jwt;
pub mod password;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::user::PublicUser;
use crate::store::{Store, UserRepository};
use self::password::{hash_password, is_bcrypt_hash, verify_password};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ADMIN_NAME: &str = "Administrador";

/// Hash checked against when the username is unknown, so that branch costs
/// the same bcrypt round as a wrong password.
static UNKNOWN_USER_HASH: OnceCell<String> = OnceCell::const_new();

async fn burn_verification(password: &str) -> Result<(), AppError> {
    let hash = UNKNOWN_USER_HASH
        .get_or_try_init(|| hash_password("unknown-user-placeholder"))
        .await?;
    verify_password(password, hash).await?;
    Ok(())
}

/// Checks a username/password pair. Lookup is case-sensitive.
///
/// A stored credential that is not a bcrypt hash comes from data written
/// before hashing existed: it only accepts the default password, and is
/// replaced by a hash on that first successful login.
pub async fn login(store: &dyn Store, username: &str, password: &str) -> Result<PublicUser, AppError> {
    let Some(user) = store.find_user_by_username(username).await? else {
        burn_verification(password).await?;
        return Err(AppError::UserNotFound);
    };

    if is_bcrypt_hash(&user.password_hash) {
        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredential);
        }
    } else {
        if password != DEFAULT_ADMIN_PASSWORD {
            return Err(AppError::InvalidCredential);
        }
        let hashed = hash_password(DEFAULT_ADMIN_PASSWORD).await?;
        store.set_password_hash(&user.id, &hashed).await?;
        warn!(user_id = %user.id, "Legacy plain-text credential replaced with a hash");
    }

    info!(user_id = %user.id, "Admin logged in");
    Ok(PublicUser::from(user))
}

pub async fn change_password(
    store: &dyn Store,
    user_id: &str,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if new_password.is_empty() {
        return Err(AppError::validation("Nova senha é obrigatória"));
    }

    let user = store.find_user(user_id).await?.ok_or(AppError::UserNotFound)?;

    let current_ok = if is_bcrypt_hash(&user.password_hash) {
        verify_password(current_password, &user.password_hash).await?
    } else {
        current_password == DEFAULT_ADMIN_PASSWORD
    };
    if !current_ok {
        return Err(AppError::InvalidCredential);
    }

    let hashed = hash_password(new_password).await?;
    store.set_password_hash(&user.id, &hashed).await?;
    info!(user_id = %user.id, "Admin password changed");
    Ok(())
}

pub async fn get_user(store: &dyn Store, user_id: &str) -> Result<PublicUser, AppError> {
    store
        .find_user(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::not_found("Usuário não encontrado"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{NewUser, ADMIN_ROLE};
    use crate::seed::seed;
    use crate::store::file::FileStore;
    use tempfile::TempDir;

    async fn seeded(dir: &TempDir) -> FileStore {
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();
        seed(&store).await;
        store
    }

    #[tokio::test]
    async fn default_admin_can_log_in_after_seeding() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir).await;

        let user = login(&store, "admin", "admin123").await.unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(user.role, "admin");
        assert_eq!(user.name, DEFAULT_ADMIN_NAME);

        let wrong = login(&store, "admin", "wrong").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredential));
    }

    #[tokio::test]
    async fn unknown_and_differently_cased_users_are_not_found() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir).await;

        assert!(matches!(login(&store, "ghost", "admin123").await, Err(AppError::UserNotFound)));
        assert!(matches!(login(&store, "ADMIN", "admin123").await, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_a_hash_check() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir).await;

        assert!(matches!(login(&store, "ghost", "x").await, Err(AppError::UserNotFound)));
        let hash = UNKNOWN_USER_HASH.get().expect("placeholder hash initialised");
        assert!(is_bcrypt_hash(hash));
    }

    #[tokio::test]
    async fn change_password_swaps_accepted_credential() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir).await;
        let user = login(&store, "admin", "admin123").await.unwrap();

        let bad = change_password(&store, &user.id, "nope", "p2").await.unwrap_err();
        assert!(matches!(bad, AppError::InvalidCredential));

        change_password(&store, &user.id, "admin123", "p2").await.unwrap();
        assert!(login(&store, "admin", "p2").await.is_ok());
        assert!(matches!(
            login(&store, "admin", "admin123").await,
            Err(AppError::InvalidCredential)
        ));

        let missing = change_password(&store, "user-missing", "p2", "p3").await.unwrap_err();
        assert!(matches!(missing, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn legacy_plain_credential_is_hashed_on_first_login() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();
        let legacy = store
            .create_user(NewUser {
                username: "admin".into(),
                password_hash: "admin123".into(),
                name: DEFAULT_ADMIN_NAME.into(),
                role: ADMIN_ROLE.into(),
            })
            .await
            .unwrap();

        assert!(matches!(login(&store, "admin", "other").await, Err(AppError::InvalidCredential)));
        let stored = store.find_user(&legacy.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "admin123");

        login(&store, "admin", "admin123").await.unwrap();
        let stored = store.find_user(&legacy.id).await.unwrap().unwrap();
        assert!(is_bcrypt_hash(&stored.password_hash));
        assert!(login(&store, "admin", "admin123").await.is_ok());
    }

    #[tokio::test]
    async fn get_user_omits_credential() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir).await;
        let user = login(&store, "admin", "admin123").await.unwrap();

        let fetched = get_user(&store, &user.id).await.unwrap();
        assert_eq!(fetched, user);
        let json = serde_json::to_value(&fetched).unwrap();
        assert!(json.get("password").is_none());

        assert!(get_user(&store, "user-missing").await.unwrap_err().is_not_found());
    }
}
