use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    collection::CollectionKind,
    dto::collections::{AddItemRequest, CollectionList, UpdateQuantityRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::collection_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{collection}",
            get(get_collection).post(add_item).delete(clear_collection),
        )
        .route("/{collection}/{product_id}", delete(remove_item))
        .route(
            "/cart/{product_id}",
            put(update_cart_quantity).delete(remove_cart_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/user/{collection}",
    params(
        ("collection" = String, Path, description = "cart, wishlist or compare")
    ),
    responses(
        (status = 200, description = "Entries whose product still exists, in insertion order", body = ApiResponse<CollectionList>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User or collection not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn get_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(collection): Path<String>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let kind = CollectionKind::parse(&collection)?;
    let resp = collection_service::get_collection(&state, &user, kind).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/user/{collection}",
    params(
        ("collection" = String, Path, description = "cart, wishlist or compare")
    ),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated collection", body = ApiResponse<CollectionList>),
        (status = 400, description = "Duplicate entry, full compare list or bad quantity"),
        (status = 404, description = "User, product or collection not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(collection): Path<String>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let kind = CollectionKind::parse(&collection)?;
    let resp = collection_service::add_item(&state, &user, kind, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/user/{collection}",
    params(
        ("collection" = String, Path, description = "cart, wishlist or compare")
    ),
    responses(
        (status = 200, description = "Collection cleared", body = ApiResponse<CollectionList>),
        (status = 404, description = "User or collection not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn clear_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(collection): Path<String>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let kind = CollectionKind::parse(&collection)?;
    let resp = collection_service::clear_collection(&state, &user, kind).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/user/{collection}/{product_id}",
    params(
        ("collection" = String, Path, description = "cart, wishlist or compare"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Updated collection; removing an absent product is not an error", body = ApiResponse<CollectionList>),
        (status = 404, description = "User or collection not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((collection, product_id)): Path<(String, Uuid)>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let kind = CollectionKind::parse(&collection)?;
    let resp = collection_service::remove_item(&state, &user, kind, product_id).await?;
    Ok(Json(resp))
}

// `/cart/{product_id}` is matched ahead of `/{collection}/{product_id}`,
// so cart removals land here.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let resp =
        collection_service::remove_item(&state, &user, CollectionKind::Cart, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/user/cart/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CollectionList>),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Item not found in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Collections"
)]
pub async fn update_cart_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CollectionList>>> {
    let resp = collection_service::update_quantity(&state, &user, product_id, payload).await?;
    Ok(Json(resp))
}
