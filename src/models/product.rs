use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const PLACEHOLDER_IMAGE: &str = "/img/produtos/placeholder.jpg";
pub const MAX_DESCRIPTION_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fitness,
    Suplementos,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Fitness, Category::Suplementos];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Fitness => "fitness",
            Category::Suplementos => "suplementos",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Fitness => "Roupas Fitness",
            Category::Suplementos => "Suplementos",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fitness" => Ok(Category::Fitness),
            "suplementos" => Ok(Category::Suplementos),
            other => Err(AppError::validation(format!(
                "Categoria inválida: '{other}' (use fitness ou suplementos)"
            ))),
        }
    }
}

/// Entry of the static category table served to catalog pages.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: &'static str,
    pub name: &'static str,
}

pub fn categories() -> Vec<CategoryInfo> {
    Category::ALL
        .iter()
        .map(|c| CategoryInfo { id: c.as_str(), name: c.label() })
        .collect()
}

/// Category query as it arrives from the outside: absent or `"all"` means
/// no filtering, anything unrecognized matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
    Unknown,
}

impl CategoryFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => CategoryFilter::All,
            Some(value) => value
                .parse::<Category>()
                .map(CategoryFilter::Only)
                .unwrap_or(CategoryFilter::Unknown),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        (self.include_inactive || product.active)
            && self.category.map_or(true, |c| product.category == c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub category_label: String,
    pub price: f64,
    pub description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Product {
    /// Builds the stored record for a validated draft.
    pub fn from_draft(id: String, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            category_label: draft.category.label().to_string(),
            price: draft.price,
            description: draft.description,
            full_description: draft.full_description,
            image: draft.image,
            images: draft.images,
            videos: draft.videos,
            sizes: draft.sizes,
            active: draft.active,
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// Merges `patch` over this record and re-validates. On error `self`
    /// is left untouched.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut next = self.clone();
        let images_replaced = patch.images.is_some();

        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(category) = patch.category {
            next.category = category.parse()?;
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(full_description) = patch.full_description {
            next.full_description = full_description;
        }
        if let Some(images) = patch.images {
            next.images = clean_list(images);
        }
        if let Some(videos) = patch.videos {
            next.videos = clean_list(videos);
        }
        if let Some(sizes) = patch.sizes {
            next.sizes = normalize_sizes(sizes);
        }
        if let Some(active) = patch.active {
            next.active = active;
        }
        match patch.image {
            Some(image) => next.image = image,
            None if images_replaced => next.image = String::new(),
            None => {}
        }

        next.name = next.name.trim().to_string();
        next.category_label = next.category.label().to_string();
        validate_fields(&next.name, next.price, &next.description)?;
        let (image, images) = with_placeholder(next.image, next.images);
        next.image = image;
        next.images = images;
        next.updated_at = Some(now);

        *self = next;
        Ok(())
    }
}

/// Product fields accepted on creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// A `NewProduct` that passed validation; the only input backends accept.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub description: String,
    pub full_description: String,
    pub image: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub sizes: Vec<String>,
    pub active: bool,
}

impl NewProduct {
    pub fn validate(self) -> Result<ProductDraft, AppError> {
        let category: Category = self.category.trim().parse()?;
        let name = self.name.trim().to_string();
        validate_fields(&name, self.price, &self.description)?;
        let (image, images) =
            with_placeholder(self.image.unwrap_or_default(), clean_list(self.images));

        Ok(ProductDraft {
            name,
            category,
            price: self.price,
            description: self.description,
            full_description: self.full_description,
            image,
            images,
            videos: clean_list(self.videos),
            sizes: normalize_sizes(self.sizes),
            active: self.active.unwrap_or(true),
        })
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub active: Option<bool>,
}

fn validate_fields(name: &str, price: f64, description: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::validation("Nome do produto é obrigatório"));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("Preço não pode ser negativo"));
    }
    if description.trim().is_empty() {
        return Err(AppError::validation("Descrição é obrigatória"));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::validation(format!(
            "Descrição deve ter no máximo {MAX_DESCRIPTION_CHARS} caracteres"
        )));
    }
    Ok(())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trims labels, drops empties and keeps the first occurrence of each.
pub fn normalize_sizes(sizes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(sizes.len());
    for size in clean_list(sizes) {
        if !out.contains(&size) {
            out.push(size);
        }
    }
    out
}

fn with_placeholder(image: String, mut images: Vec<String>) -> (String, Vec<String>) {
    if images.is_empty() {
        images.push(PLACEHOLDER_IMAGE.to_string());
    }
    let image = if image.trim().is_empty() {
        images[0].clone()
    } else {
        image
    };
    (image, images)
}
