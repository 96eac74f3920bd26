//! Flat-file backend: the whole dataset lives in one JSON document with
//! top-level `products`, `users` and `settings` keys.
//!
//! Each mutation reads the file, changes it in memory and writes it back.
//! All of those cycles go through one mutex, and the new contents are
//! written to a sibling temp file and renamed over the original, so
//! concurrent requests cannot clobber each other and a crash mid-write
//! leaves the previous version in place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ProductRepository, SettingsRepository, Store, UserRepository};
use crate::error::AppError;
use crate::models::product::{Product, ProductDraft, ProductFilter, ProductPatch};
use crate::models::settings::Settings;
use crate::models::user::{NewUser, User, ADMIN_ROLE};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Dataset {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    settings: Option<Settings>,
}

pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (and validates) the data file. A missing file is fine and is
    /// created on the first write; an unreadable one is an error.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) };
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let dataset = store.read().await?;
        info!(
            path = %store.path.display(),
            products = dataset.products.len(),
            users = dataset.users.len(),
            "Data file opened"
        );
        Ok(store)
    }

    async fn read(&self) -> Result<Dataset, AppError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Dataset::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::storage(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Dataset::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, dataset: &Dataset) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(dataset)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Data file written");
        Ok(())
    }

    /// Snapshot read; takes the lock so it never observes a half-finished cycle.
    async fn load(&self) -> Result<Dataset, AppError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Read-modify-write under the lock. Nothing is written when `f` fails.
    async fn mutate<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Dataset) -> Result<T, AppError> + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut dataset = self.read().await?;
        let out = f(&mut dataset)?;
        self.write(&dataset).await?;
        Ok(out)
    }
}

fn product_not_found() -> AppError {
    AppError::not_found("Produto não encontrado")
}

#[async_trait]
impl ProductRepository for FileStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self
            .load()
            .await?
            .products
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.load().await?.products.into_iter().find(|p| p.id == id))
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, AppError> {
        let product = Product::from_draft(format!("prod-{}", Uuid::new_v4()), draft, Utc::now());
        self.mutate(move |data| {
            data.products.push(product.clone());
            Ok(product)
        })
        .await
    }

    async fn create_products(&self, drafts: Vec<ProductDraft>) -> Result<Vec<Product>, AppError> {
        let now = Utc::now();
        let products: Vec<Product> = drafts
            .into_iter()
            .map(|draft| Product::from_draft(format!("prod-{}", Uuid::new_v4()), draft, now))
            .collect();
        self.mutate(move |data| {
            data.products.extend(products.iter().cloned());
            Ok(products)
        })
        .await
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, AppError> {
        self.mutate(|data| {
            let product = data
                .products
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(product_not_found)?;
            product.apply(patch, Utc::now())?;
            Ok(product.clone())
        })
        .await
    }

    async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        self.mutate(|data| {
            let index = data
                .products
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(product_not_found)?;
            data.products.remove(index);
            Ok(())
        })
        .await
    }

    async fn count_products(&self) -> Result<i64, AppError> {
        Ok(self.load().await?.products.len() as i64)
    }

    async fn toggle_active(&self, id: &str) -> Result<Product, AppError> {
        self.mutate(|data| {
            let product = data
                .products
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(product_not_found)?;
            product.active = !product.active;
            product.updated_at = Some(Utc::now());
            Ok(product.clone())
        })
        .await
    }
}

#[async_trait]
impl SettingsRepository for FileStore {
    async fn find_settings(&self) -> Result<Option<Settings>, AppError> {
        Ok(self.load().await?.settings)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        let settings = settings.clone();
        self.mutate(move |data| {
            data.settings = Some(settings);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserRepository for FileStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.load().await?.users.into_iter().find(|u| u.id == id))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.load().await?.users.into_iter().find(|u| u.username == username))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.mutate(move |data| {
            if data.users.iter().any(|u| u.username == user.username) {
                return Err(AppError::validation("Nome de usuário já existe"));
            }
            let user = User {
                id: format!("user-{}", Uuid::new_v4()),
                username: user.username,
                password_hash: user.password_hash,
                name: user.name,
                role: user.role,
                created_at: Utc::now(),
            };
            data.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        self.mutate(|data| {
            let user = data
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| AppError::not_found("Usuário não encontrado"))?;
            user.password_hash = password_hash.to_string();
            Ok(())
        })
        .await
    }

    async fn count_admins(&self) -> Result<i64, AppError> {
        Ok(self
            .load()
            .await?
            .users
            .iter()
            .filter(|u| u.role == ADMIN_ROLE)
            .count() as i64)
    }
}

impl Store for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::product::{CategoryFilter, NewProduct};
    use crate::models::settings::SettingsPatch;
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("db.json")).await.unwrap()
    }

    fn draft(name: &str, category: &str) -> ProductDraft {
        NewProduct {
            name: name.into(),
            category: category.into(),
            price: 49.9,
            description: format!("{name} descrição"),
            sizes: vec!["P".into(), "M".into()],
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn created_product_reads_back_equal() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let d = draft("Top Nadador", "fitness");
        let created = store.create_product(d.clone()).await.unwrap();
        assert!(created.id.starts_with("prod-"));

        let fetched = store.find_product(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, d.name);
        assert_eq!(fetched.sizes, d.sizes);
        assert_eq!(fetched.category_label, "Roupas Fitness");
    }

    #[tokio::test]
    async fn bulk_create_keeps_every_product() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let created = store
            .create_products(vec![draft("Legging", "fitness"), draft("Whey", "suplementos")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);
        assert_eq!(store.count_products().await.unwrap(), 2);
        for product in &created {
            assert_eq!(store.find_product(&product.id).await.unwrap().as_ref(), Some(product));
        }
    }

    #[tokio::test]
    async fn unknown_or_malformed_id_is_none() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        assert!(store.find_product("nope").await.unwrap().is_none());
        assert!(store.find_product("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn public_listing_hides_inactive_and_sorts_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let first = store.create_product(draft("Primeiro", "fitness")).await.unwrap();
        let second = store.create_product(draft("Segundo", "suplementos")).await.unwrap();
        let hidden = store.create_product(draft("Oculto", "fitness")).await.unwrap();
        store.toggle_active(&hidden.id).await.unwrap();

        let public = store.list_public(CategoryFilter::All).await.unwrap();
        let ids: Vec<_> = public.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        let all = store.list_all(CategoryFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().any(|p| p.id == hidden.id && !p.active));

        let fitness = store
            .list_all(CategoryFilter::parse(Some("fitness")))
            .await
            .unwrap();
        assert_eq!(fitness.len(), 2);

        let unknown = store.list_all(CategoryFilter::parse(Some("sapatos"))).await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn update_missing_id_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.create_product(draft("Shorts", "fitness")).await.unwrap();
        let before = tokio::fs::read(dir.path().join("db.json")).await.unwrap();

        let err = store
            .update_product("prod-missing", ProductPatch { price: Some(1.0), ..Default::default() })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let after = tokio::fs::read(dir.path().join("db.json")).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn update_merges_and_validates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let created = store.create_product(draft("Shorts", "fitness")).await.unwrap();

        let updated = store
            .update_product(&created.id, ProductPatch { price: Some(59.9), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.price, 59.9);
        assert_eq!(updated.name, "Shorts");
        assert!(updated.updated_at >= created.updated_at);

        let rejected = store
            .update_product(&created.id, ProductPatch { price: Some(-5.0), ..Default::default() })
            .await;
        assert!(matches!(rejected, Err(AppError::ValidationError(_))));
        let stored = store.find_product(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.price, 59.9);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let created = store.create_product(draft("Shorts", "fitness")).await.unwrap();

        store.delete_product(&created.id).await.unwrap();
        let err = store.delete_product(&created.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn toggle_twice_restores_flag() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let created = store.create_product(draft("Shorts", "fitness")).await.unwrap();

        assert!(!store.toggle_active(&created.id).await.unwrap().active);
        assert!(store.toggle_active(&created.id).await.unwrap().active);
        assert!(store.toggle_active("prod-missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn settings_are_created_lazily_and_merged() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        assert!(store.find_settings().await.unwrap().is_none());

        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings, Settings::default());
        assert!(store.find_settings().await.unwrap().is_some());

        let updated = store
            .update_settings(SettingsPatch { email: Some("x".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.email, "x");
        assert_eq!(updated.store_name, settings.store_name);
        assert_eq!(updated.store_slogan, settings.store_slogan);
        assert_eq!(updated.whatsapp_number, settings.whatsapp_number);
        assert_eq!(updated.instagram, settings.instagram);
    }

    #[tokio::test]
    async fn concurrent_creates_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store(&dir).await);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.create_product(draft(&format!("Item {i}"), "fitness")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reopened = FileStore::open(dir.path().join("db.json")).await.unwrap();
        assert_eq!(reopened.count_products().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn usernames_are_unique_and_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let new_user = || NewUser {
            username: "admin".into(),
            password_hash: "$2b$10$abc".into(),
            name: "Administrador".into(),
            role: ADMIN_ROLE.into(),
        };

        let user = store.create_user(new_user()).await.unwrap();
        assert!(store.create_user(new_user()).await.is_err());
        assert_eq!(store.count_admins().await.unwrap(), 1);
        assert_eq!(store.find_user(&user.id).await.unwrap().unwrap().username, "admin");
        assert!(store.find_user_by_username("Admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_rejected_at_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        assert!(matches!(FileStore::open(&path).await, Err(AppError::Storage(_))));
    }
}
