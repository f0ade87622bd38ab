use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product record in the `productos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    /// Supplied by the client, never generated.
    pub id: i32,
    #[serde(rename = "nombre")]
    #[sqlx(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    #[sqlx(rename = "precio")]
    pub price: f64,
    pub stock: i32,
    #[serde(rename = "categoria")]
    #[sqlx(rename = "categoria")]
    pub category: String,
    #[serde(rename = "estado")]
    #[sqlx(rename = "estado")]
    pub active: bool,
}

/// Validated input for an insert; `active` is always stored as true.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category: String,
}

impl From<NewProduct> for Product {
    fn from(p: NewProduct) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
            stock: p.stock,
            category: p.category,
            active: true,
        }
    }
}
