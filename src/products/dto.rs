use serde::{Deserialize, Serialize};

use crate::products::repo_types::Product;

/// Request body for product creation. Every field is required, but they are
/// optional here so a missing one yields our own 400 instead of a serde error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    pub id: Option<i32>,
    #[serde(rename = "nombre", alias = "name")]
    pub name: Option<String>,
    #[serde(rename = "precio", alias = "price")]
    pub price: Option<f64>,
    pub stock: Option<i32>,
    #[serde(rename = "categoria", alias = "category")]
    pub category: Option<String>,
}

/// Request body for a partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(rename = "nombre", alias = "name")]
    pub name: Option<String>,
    #[serde(rename = "precio", alias = "price")]
    pub price: Option<f64>,
    pub stock: Option<i32>,
    #[serde(rename = "categoria", alias = "category")]
    pub category: Option<String>,
}

/// Response for create and update.
#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub message: String,
    pub producto: Product,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
