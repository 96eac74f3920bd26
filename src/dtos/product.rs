// src/dtos/product.rs
use serde::{Deserialize, Serialize};

use crate::models::product::Product;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub formatted_price: String,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            formatted_price: format_price(product.price),
            product,
        }
    }
}

/// `89.9` -> `R$ 89,90`
pub fn format_price(price: f64) -> String {
    format!("R$ {price:.2}").replace('.', ",")
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub fitness_products: usize,
    pub suplementos_products: usize,
    pub active_products: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_uses_brazilian_format() {
        assert_eq!(format_price(89.9), "R$ 89,90");
        assert_eq!(format_price(0.0), "R$ 0,00");
        assert_eq!(format_price(159.899), "R$ 159,90");
    }
}
