use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Product, Specifications, Unit};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub brand: Option<String>,
    pub price: i64,
    pub original_price: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: Category,
    pub description: String,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default)]
    pub features: Vec<String>,
    pub stock: Option<i32>,
    pub unit: Option<Unit>,
    pub minimum_order: Option<i32>,
    pub rating: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub specifications: Option<Specifications>,
    pub features: Option<Vec<String>>,
    pub stock: Option<i32>,
    pub unit: Option<Unit>,
    pub minimum_order: Option<i32>,
    pub rating: Option<f64>,
    pub is_active: Option<bool>,
}

/// Body of `POST /api/products/filter`. Zero values count as "not set".
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub brand: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
