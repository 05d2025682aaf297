use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sea_orm::ActiveValue::NotSet;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit,
    catalog::{ProductFilter, SortKey},
    dto::products::{CreateProductRequest, FilterRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub const DEFAULT_BRAND: &str = "Sri Saravana Textile";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (filter, sort) = ProductFilter::from_query(&query)?;
    let orm = state.orm().await?;
    let items = find_products(&orm, &filter, sort).await?;
    Ok(product_list("Products", items))
}

pub async fn search_products(state: &AppState, text: &str) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter::text_search(text);
    let orm = state.orm().await?;
    let items = find_products(&orm, &filter, None).await?;
    Ok(product_list("Search results", items))
}

pub async fn filter_products(
    state: &AppState,
    payload: FilterRequest,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter::from_request(&payload)?;
    let orm = state.orm().await?;
    let items = find_products(&orm, &filter, None).await?;
    Ok(product_list("Filtered products", items))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let orm = state.orm().await?;
    let product = find_model(&orm, id).await?;
    Ok(ApiResponse::success("Product", Product::try_from(product)?, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let fields = ProductFields {
        name: payload.name.trim().to_string(),
        price: payload.price,
        original_price: payload.original_price,
        stock: payload.stock.unwrap_or(0),
        minimum_order: payload.minimum_order.unwrap_or(1),
        rating: payload.rating.unwrap_or(0.0),
    };
    fields.validate()?;

    let brand = normalize_brand(payload.brand);

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(fields.name),
        brand: Set(brand),
        price: Set(fields.price),
        original_price: Set(fields.original_price),
        images: Set(to_json(&payload.images)?),
        category: Set(payload.category.as_str().to_string()),
        description: Set(payload.description),
        specifications: Set(to_json(&payload.specifications)?),
        features: Set(to_json(&payload.features)?),
        stock: Set(fields.stock),
        unit: Set(payload.unit.unwrap_or_default().as_str().to_string()),
        minimum_order: Set(fields.minimum_order),
        rating: Set(fields.rating),
        reviews: Set(serde_json::json!([])),
        is_active: Set(true),
        created_at: NotSet,
    };

    let orm = state.orm().await?;
    let product = active.insert(&orm).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "product created");

    audit::record(
        &orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product added successfully",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let orm = state.orm().await?;
    let existing = find_model(&orm, id).await?;

    let active = apply_update(existing, payload)?;
    let product = active.update(&orm).await?;

    audit::record(
        &orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated successfully",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

/// Deletes a product and returns it. Collection entries pointing at it stay
/// stored and stop showing up when read.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let orm = state.orm().await?;
    let existing = find_model(&orm, id).await?;

    let result = Products::delete_by_id(id).exec(&orm).await?;
    if result.rows_affected == 0 {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "product deleted");

    audit::record(
        &orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted successfully",
        Product::try_from(existing)?,
        Some(Meta::empty()),
    ))
}

async fn find_products(
    orm: &DatabaseConnection,
    filter: &ProductFilter,
    sort: Option<SortKey>,
) -> AppResult<Vec<Product>> {
    let mut items = Products::find()
        .filter(filter.condition())
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(orm)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    if let Some(sort) = sort {
        sort.apply(&mut items);
    }
    Ok(items)
}

async fn find_model(orm: &DatabaseConnection, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(orm)
        .await?
        .ok_or_else(product_not_found)
}

fn product_list(message: &str, items: Vec<Product>) -> ApiResponse<ProductList> {
    let meta = Meta::total(items.len());
    ApiResponse::success(message, ProductList { items }, Some(meta))
}

/// Turns a partial update into an active model that marks only the supplied
/// columns dirty. Range rules are checked against the merged values.
fn apply_update(existing: ProductModel, payload: UpdateProductRequest) -> AppResult<ActiveModel> {
    let name = payload.name.as_deref().map(|n| n.trim().to_string());
    ProductFields {
        name: name.clone().unwrap_or_else(|| existing.name.clone()),
        price: payload.price.unwrap_or(existing.price),
        original_price: payload.original_price.unwrap_or(existing.original_price),
        stock: payload.stock.unwrap_or(existing.stock),
        minimum_order: payload.minimum_order.unwrap_or(existing.minimum_order),
        rating: payload.rating.unwrap_or(existing.rating),
    }
    .validate()?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(original_price) = payload.original_price {
        active.original_price = Set(original_price);
    }
    // Orders decrement stock concurrently; only an explicit value may overwrite it.
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(minimum_order) = payload.minimum_order {
        active.minimum_order = Set(minimum_order);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if payload.brand.is_some() {
        active.brand = Set(normalize_brand(payload.brand));
    }
    if let Some(images) = payload.images {
        active.images = Set(to_json(&images)?);
    }
    if let Some(category) = payload.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(specifications) = payload.specifications {
        active.specifications = Set(to_json(&specifications)?);
    }
    if let Some(features) = payload.features {
        active.features = Set(to_json(&features)?);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit.as_str().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    Ok(active)
}

fn normalize_brand(brand: Option<String>) -> String {
    brand
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BRAND.to_string())
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}

fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

/// Fields with range rules, checked after a create or a partial update is applied.
#[derive(Debug)]
struct ProductFields {
    name: String,
    price: i64,
    original_price: i64,
    stock: i32,
    minimum_order: i32,
    rating: f64,
}

impl ProductFields {
    fn validate(&self) -> AppResult<()> {
        let problem = if self.name.is_empty() {
            Some("Product name is required")
        } else if self.price < 0 {
            Some("price must not be negative")
        } else if self.original_price < 0 {
            Some("originalPrice must not be negative")
        } else if self.stock < 0 {
            Some("stock must not be negative")
        } else if self.minimum_order < 1 {
            Some("minimumOrder must be at least 1")
        } else if !(0.0..=5.0).contains(&self.rating) {
            Some("rating must be between 0 and 5")
        } else {
            None
        };

        match problem {
            Some(message) => Err(AppError::InvalidArgument(message.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ProductFields {
        ProductFields {
            name: "Cotton Wick Roll".into(),
            price: 260,
            original_price: 300,
            stock: 12,
            minimum_order: 1,
            rating: 4.2,
        }
    }

    #[test]
    fn valid_fields_pass() {
        assert!(fields().validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_invalid() {
        let cases = [
            ProductFields { name: String::new(), ..fields() },
            ProductFields { price: -1, ..fields() },
            ProductFields { original_price: -5, ..fields() },
            ProductFields { stock: -1, ..fields() },
            ProductFields { minimum_order: 0, ..fields() },
            ProductFields { rating: 5.5, ..fields() },
            ProductFields { rating: f64::NAN, ..fields() },
        ];
        for case in cases {
            assert!(
                matches!(case.validate(), Err(AppError::InvalidArgument(_))),
                "{case:?}"
            );
        }
    }

    fn stored_product() -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            name: "Cotton Wick Roll".into(),
            brand: DEFAULT_BRAND.into(),
            price: 260,
            original_price: 300,
            images: serde_json::json!([]),
            category: "Cotton Wicks".into(),
            description: "Plain wick".into(),
            specifications: serde_json::json!({}),
            features: serde_json::json!([]),
            stock: 10,
            unit: "Kg".into(),
            minimum_order: 1,
            rating: 4.2,
            reviews: serde_json::json!([]),
            is_active: true,
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn update_leaves_untouched_columns_clean() {
        let payload = UpdateProductRequest {
            description: Some("Braided wick".into()),
            ..UpdateProductRequest::default()
        };
        let active = apply_update(stored_product(), payload).unwrap();
        assert!(active.description.is_set());
        assert!(!active.stock.is_set());
        assert!(!active.price.is_set());
        assert!(!active.name.is_set());
        assert!(!active.brand.is_set());
    }

    #[test]
    fn update_sets_supplied_stock_and_checks_merged_ranges() {
        let payload = UpdateProductRequest { stock: Some(4), ..UpdateProductRequest::default() };
        let active = apply_update(stored_product(), payload).unwrap();
        assert!(active.stock.is_set());
        assert_eq!(active.stock.as_ref(), &4);

        let payload = UpdateProductRequest { stock: Some(-1), ..UpdateProductRequest::default() };
        assert!(matches!(
            apply_update(stored_product(), payload),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn update_trims_brand_and_falls_back_when_blank() {
        let payload = UpdateProductRequest { brand: Some("  SST Mills ".into()), ..UpdateProductRequest::default() };
        let active = apply_update(stored_product(), payload).unwrap();
        assert_eq!(active.brand.as_ref(), "SST Mills");

        let payload = UpdateProductRequest { brand: Some("   ".into()), ..UpdateProductRequest::default() };
        let active = apply_update(stored_product(), payload).unwrap();
        assert_eq!(active.brand.as_ref(), DEFAULT_BRAND);
    }
}
