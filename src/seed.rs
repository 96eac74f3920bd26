//! First-boot data. Safe to run on every start: each collection is only
//! filled when empty, and failures are logged instead of returned.

use tracing::{error, info};

use crate::auth::password::hash_password;
use crate::auth::{DEFAULT_ADMIN_NAME, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::error::AppError;
use crate::models::product::NewProduct;
use crate::models::user::{NewUser, ADMIN_ROLE};
use crate::store::{ProductRepository, SettingsRepository, Store, UserRepository};

pub fn default_catalog() -> Vec<NewProduct> {
    let item = |name: &str, category: &str, price: f64, description: &str, full: &str, file: &str, sizes: &[&str]| {
        let path = format!("/img/produtos/{file}");
        NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            price,
            description: description.to_string(),
            full_description: full.to_string(),
            image: Some(path.clone()),
            images: vec![path],
            videos: Vec::new(),
            sizes: sizes.iter().map(|s| s.to_string()).collect(),
            active: Some(true),
        }
    };

    vec![
        item(
            "Blusa Gym Branca",
            "fitness",
            89.90,
            "Blusa confortável para treinos intensos",
            "Blusa de alta qualidade, perfeita para seus treinos mais intensos. Tecido respirável e confortável.",
            "blusa-gym-branca.jpeg",
            &["P", "M", "G", "GG"],
        ),
        item(
            "Conjunto Saia e Blusa",
            "fitness",
            159.90,
            "Conjunto elegante e versátil",
            "Conjunto perfeito para o dia a dia com estilo fitness.",
            "conjunto-saia-e-blusa.jpeg",
            &["P", "M", "G"],
        ),
        item(
            "Conjunto Top Short Folgado",
            "fitness",
            149.90,
            "Conforto e estilo para seu treino",
            "Conjunto confortável e estiloso para seus treinos.",
            "conjunto-top-short-folgado-branco.jpeg",
            &["P", "M", "G", "GG"],
        ),
        item(
            "Secaps Black Chá",
            "suplementos",
            89.90,
            "Termogênico com chá verde e cafeína",
            "Suplemento termogênico para auxiliar na queima de gordura.",
            "secaps-black-cha.jpeg",
            &[],
        ),
        item(
            "Creatina Gummy",
            "suplementos",
            99.90,
            "Creatina em gomas saborosas",
            "Creatina de alta qualidade em formato de gomas deliciosas.",
            "creatina-gummy.jpeg",
            &[],
        ),
    ]
}

/// Runs the three independent seeding checks.
pub async fn seed(store: &dyn Store) {
    if let Err(e) = seed_products(store).await {
        error!(error = %e, "Failed to seed products");
    }
    if let Err(e) = seed_admin(store).await {
        error!(error = %e, "Failed to seed admin user");
    }
    if let Err(e) = seed_settings(store).await {
        error!(error = %e, "Failed to seed settings");
    }
}

async fn seed_products(store: &dyn Store) -> Result<(), AppError> {
    if store.count_products().await? > 0 {
        return Ok(());
    }
    let drafts = default_catalog()
        .into_iter()
        .map(NewProduct::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let created = store.create_products(drafts).await?;
    info!(count = created.len(), "Default products created");
    Ok(())
}

async fn seed_admin(store: &dyn Store) -> Result<(), AppError> {
    if store.count_admins().await? > 0 {
        return Ok(());
    }
    let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD).await?;
    store
        .create_user(NewUser {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash,
            name: DEFAULT_ADMIN_NAME.to_string(),
            role: ADMIN_ROLE.to_string(),
        })
        .await?;
    info!(username = DEFAULT_ADMIN_USERNAME, "Admin user created with the default password");
    Ok(())
}

async fn seed_settings(store: &dyn Store) -> Result<(), AppError> {
    if store.find_settings().await?.is_none() {
        store.get_settings().await?;
        info!("Default settings created");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::{Category, CategoryFilter};
    use crate::models::settings::Settings;
    use crate::store::file::FileStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn seeding_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();

        seed(&store).await;

        let products = store.list_all(CategoryFilter::All).await.unwrap();
        assert_eq!(products.len(), 5);
        assert_eq!(products.iter().filter(|p| p.category == Category::Fitness).count(), 3);
        assert_eq!(products.iter().filter(|p| p.category == Category::Suplementos).count(), 2);
        assert!(products.iter().all(|p| p.active && !p.images.is_empty()));

        assert_eq!(store.count_admins().await.unwrap(), 1);

        let settings = store.find_settings().await.unwrap().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.store_name, "Madame Modas");
        assert_eq!(settings.whatsapp_number, "5500000000000");
    }

    #[tokio::test]
    async fn seeding_twice_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();

        seed(&store).await;
        seed(&store).await;

        assert_eq!(store.count_products().await.unwrap(), 5);
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn checks_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("db.json")).await.unwrap();
        let custom = default_catalog().remove(0).validate().unwrap();
        store.create_product(custom).await.unwrap();

        seed(&store).await;

        assert_eq!(store.count_products().await.unwrap(), 1);
        assert_eq!(store.count_admins().await.unwrap(), 1);
        assert!(store.find_settings().await.unwrap().is_some());
    }

    #[test]
    fn default_catalog_is_valid() {
        for product in default_catalog() {
            product.validate().unwrap();
        }
    }
}
