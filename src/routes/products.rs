use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{FilterRequest, ProductList},
    error::AppResult,
    models::Product,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/filter", post(filter_products))
        .route("/search/{query}", get(search_products))
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products matching every given filter", body = ApiResponse<ProductList>),
        (status = 400, description = "Malformed filter value"),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/search/{query}",
    params(
        ("query" = String, Path, description = "Text matched against name, brand and description")
    ),
    responses(
        (status = 200, description = "Active products matching the text", body = ApiResponse<ProductList>),
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::search_products(&state, &query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/filter",
    request_body = FilterRequest,
    responses(
        (status = 200, description = "Active products matching the filter", body = ApiResponse<ProductList>),
        (status = 400, description = "Invalid filter"),
    ),
    tag = "Products"
)]
pub async fn filter_products(
    State(state): State<AppState>,
    Json(payload): Json<FilterRequest>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::filter_products(&state, payload).await?;
    Ok(Json(resp))
}
