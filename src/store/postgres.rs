//! Database backend on PostgreSQL. Ids are engine-assigned UUIDs; any id
//! that does not parse as one resolves to "not found".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{error, info};
use uuid::Uuid;

use super::{ProductRepository, SettingsRepository, Store, UserRepository};
use crate::error::AppError;
use crate::models::product::{Category, Product, ProductDraft, ProductFilter, ProductPatch};
use crate::models::settings::Settings;
use crate::models::user::{NewUser, User, ADMIN_ROLE};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS products (
        id               UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name             TEXT NOT NULL,
        category         TEXT NOT NULL CHECK (category IN ('fitness', 'suplementos')),
        category_label   TEXT NOT NULL,
        price            DOUBLE PRECISION NOT NULL CHECK (price >= 0),
        description      VARCHAR(150) NOT NULL,
        full_description TEXT NOT NULL DEFAULT '',
        image            TEXT NOT NULL,
        images           TEXT[] NOT NULL DEFAULT '{}',
        videos           TEXT[] NOT NULL DEFAULT '{}',
        sizes            TEXT[] NOT NULL DEFAULT '{}',
        active           BOOLEAN NOT NULL DEFAULT TRUE,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at       TIMESTAMPTZ
    )"#,
    "CREATE INDEX IF NOT EXISTS products_created_at_idx ON products (created_at DESC)",
    r#"CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name          TEXT NOT NULL DEFAULT '',
        role          TEXT NOT NULL DEFAULT 'admin',
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS settings (
        id              SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
        store_name      TEXT NOT NULL,
        store_slogan    TEXT NOT NULL,
        whatsapp_number TEXT NOT NULL,
        instagram       TEXT NOT NULL,
        email           TEXT NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

const PRODUCT_COLUMNS: &str = "id, name, category, category_label, price, description, \
     full_description, image, images, videos, sizes, active, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects once and creates the schema. The pool is then shared by
    /// every request for the lifetime of the process.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                AppError::db(e)
            })?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Database connected");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn product_not_found() -> AppError {
    AppError::not_found("Produto não encontrado")
}

async fn insert_product<'e, E>(executor: E, draft: &ProductDraft) -> Result<Product, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products
            (name, category, category_label, price, description, full_description,
             image, images, videos, sizes, active, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&draft.name)
    .bind(draft.category.as_str())
    .bind(draft.category.label())
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.full_description)
    .bind(&draft.image)
    .bind(&draft.images)
    .bind(&draft.videos)
    .bind(&draft.sizes)
    .bind(draft.active)
    .fetch_one(executor)
    .await?;

    Product::try_from(row)
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    category_label: String,
    price: f64,
    description: String,
    full_description: String,
    image: String,
    images: Vec<String>,
    videos: Vec<String>,
    sizes: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category: Category = row
            .category
            .parse()
            .map_err(|_| AppError::internal(format!("unknown category '{}' in row {}", row.category, row.id)))?;
        Ok(Product {
            id: row.id.to_string(),
            name: row.name,
            category,
            category_label: row.category_label,
            price: row.price,
            description: row.description,
            full_description: row.full_description,
            image: row.image,
            images: row.images,
            videos: row.videos,
            sizes: row.sizes,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.to_string(),
            username: row.username,
            password_hash: row.password_hash,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    store_name: String,
    store_slogan: String,
    whatsapp_number: String,
    instagram: String,
    email: String,
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::TEXT IS NULL OR category = $1) AND ($2 OR active)
             ORDER BY created_at DESC"
        ))
        .bind(filter.category.map(Category::as_str))
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product, AppError> {
        insert_product(&self.pool, &draft).await
    }

    async fn create_products(&self, drafts: Vec<ProductDraft>) -> Result<Vec<Product>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            created.push(insert_product(&mut *tx, draft).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, AppError> {
        let id = parse_id(id).ok_or_else(product_not_found)?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(product_not_found)?;

        let mut product = Product::try_from(row)?;
        product.apply(patch, Utc::now())?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET
                name = $2, category = $3, category_label = $4, price = $5,
                description = $6, full_description = $7, image = $8,
                images = $9, videos = $10, sizes = $11, active = $12, updated_at = $13
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.category_label)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.full_description)
        .bind(&product.image)
        .bind(&product.images)
        .bind(&product.videos)
        .bind(&product.sizes)
        .bind(product.active)
        .bind(product.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Product::try_from(row)
    }

    async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        let id = parse_id(id).ok_or_else(product_not_found)?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(product_not_found());
        }
        Ok(())
    }

    async fn count_products(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn toggle_active(&self, id: &str) -> Result<Product, AppError> {
        let id = parse_id(id).ok_or_else(product_not_found)?;
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET active = NOT active, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(product_not_found)
        .and_then(Product::try_from)
    }
}

#[async_trait]
impl SettingsRepository for PgStore {
    async fn find_settings(&self) -> Result<Option<Settings>, AppError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT store_name, store_slogan, whatsapp_number, instagram, email
             FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Settings {
            store_name: r.store_name,
            store_slogan: r.store_slogan,
            whatsapp_number: r.whatsapp_number,
            instagram: r.instagram,
            email: r.email,
        }))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO settings (id, store_name, store_slogan, whatsapp_number, instagram, email)
             VALUES (1, $1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                store_name = EXCLUDED.store_name,
                store_slogan = EXCLUDED.store_slogan,
                whatsapp_number = EXCLUDED.whatsapp_number,
                instagram = EXCLUDED.instagram,
                email = EXCLUDED.email,
                updated_at = now()",
        )
        .bind(&settings.store_name)
        .bind(&settings.store_slogan)
        .bind(&settings.whatsapp_number)
        .bind(&settings.instagram)
        .bind(&settings.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, name, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, password_hash, name, role, created_at",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().as_deref() == Some("23505") {
                    return AppError::validation("Nome de usuário já existe");
                }
            }
            AppError::db(e)
        })?;
        Ok(User::from(row))
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        let id = parse_id(id).ok_or_else(|| AppError::not_found("Usuário não encontrado"))?;
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Usuário não encontrado"));
        }
        Ok(())
    }

    async fn count_admins(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(ADMIN_ROLE)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_never_reach_the_database() {
        assert_eq!(parse_id("prod-1"), None);
        assert_eq!(parse_id(""), None);

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()), Some(id));
        assert_eq!(parse_id(&id.to_string().to_uppercase()), Some(id));
    }
}
