//! Persistence layer.
//!
//! Handlers only see the repository traits below through `Arc<dyn Store>`;
//! which backend sits behind it is decided once at startup from
//! configuration.

pub mod file;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::product::{Category, CategoryFilter, Product, ProductDraft, ProductFilter, ProductPatch};
use crate::models::settings::{Settings, SettingsPatch};
use crate::models::user::{NewUser, User};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products matching `filter`, newest first.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError>;

    /// `Ok(None)` for unknown ids, including ids the backend cannot parse.
    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError>;

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, AppError>;

    /// Inserts every draft or none of them.
    async fn create_products(&self, drafts: Vec<ProductDraft>) -> Result<Vec<Product>, AppError>;

    /// Fails with `NotFound` (and writes nothing) when `id` is unknown.
    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, AppError>;

    async fn delete_product(&self, id: &str) -> Result<(), AppError>;

    async fn count_products(&self) -> Result<i64, AppError>;

    /// Flips the `active` flag in one step.
    async fn toggle_active(&self, id: &str) -> Result<Product, AppError>;

    async fn list_public(&self, category: CategoryFilter) -> Result<Vec<Product>, AppError> {
        match product_filter(category, false) {
            Some(filter) => self.list_products(filter).await,
            None => Ok(Vec::new()),
        }
    }

    async fn list_all(&self, category: CategoryFilter) -> Result<Vec<Product>, AppError> {
        match product_filter(category, true) {
            Some(filter) => self.list_products(filter).await,
            None => Ok(Vec::new()),
        }
    }
}

/// `None` when the category can match nothing.
fn product_filter(category: CategoryFilter, include_inactive: bool) -> Option<ProductFilter> {
    let category: Option<Category> = match category {
        CategoryFilter::All => None,
        CategoryFilter::Only(c) => Some(c),
        CategoryFilter::Unknown => return None,
    };
    Some(ProductFilter { category, include_inactive })
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn find_settings(&self) -> Result<Option<Settings>, AppError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError>;

    /// Returns the stored settings, persisting the defaults first if none exist.
    async fn get_settings(&self) -> Result<Settings, AppError> {
        if let Some(settings) = self.find_settings().await? {
            return Ok(settings);
        }
        let settings = Settings::default();
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, AppError> {
        let mut settings = self.find_settings().await?.unwrap_or_default();
        settings.merge(patch);
        self.save_settings(&settings).await?;
        Ok(settings)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Exact, case-sensitive match.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), AppError>;

    async fn count_admins(&self) -> Result<i64, AppError>;
}

pub trait Store: ProductRepository + SettingsRepository + UserRepository {
    fn backend_name(&self) -> &'static str;
}

/// Opens the backend chosen in `config`. Errors here are fatal at startup.
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match &config.storage {
        StorageBackend::Postgres { database_url } => {
            let store = postgres::PgStore::connect(database_url).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::File { path } => {
            let store = file::FileStore::open(path).await?;
            Ok(Arc::new(store))
        }
    }
}
