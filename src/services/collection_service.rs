use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    collection::{AddPlan, CollectionKind, plan_add, validate_quantity},
    dto::collections::{AddItemRequest, CollectionEntry, CollectionList, UpdateQuantityRequest},
    entity::{
        Products, Users,
        collection_items::{ActiveModel as EntryActive, Column as EntryCol, Entity as CollectionItems, Model as EntryModel},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_collection(
    state: &AppState,
    user: &AuthUser,
    kind: CollectionKind,
) -> AppResult<ApiResponse<CollectionList>> {
    let orm = state.orm().await?;
    if Users::find_by_id(user.user_id).one(&orm).await?.is_none() {
        return Err(user_not_found());
    }

    let items = populated(&orm, user.user_id, kind).await?;
    Ok(respond(format!("{} fetched", capitalize(kind.policy().label)), items))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    kind: CollectionKind,
    payload: AddItemRequest,
) -> AppResult<ApiResponse<CollectionList>> {
    let orm = state.orm().await?;
    let txn = orm.begin().await?;
    lock_owner(&txn, user.user_id).await?;

    if Products::find_by_id(payload.product_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let entries = stored_entries(&txn, user.user_id, kind).await?;
    let plan = plan_add(kind, &entries, payload.product_id, payload.quantity)?;
    match plan {
        AddPlan::Insert { quantity } => {
            EntryActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                collection: Set(kind.as_str().to_string()),
                product_id: Set(payload.product_id),
                quantity: Set(quantity),
                position: NotSet,
                added_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
        AddPlan::Increment { index, quantity } => {
            let mut active: EntryActive = entries[index].clone().into();
            active.quantity = Set(Some(quantity));
            active.update(&txn).await?;
        }
    }

    let items = populated(&txn, user.user_id, kind).await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, collection = kind.as_str(), ?plan, "collection item added");
    audit::record(
        &orm,
        Some(user.user_id),
        "collection_add",
        "user_collection_items",
        serde_json::json!({ "collection": kind, "product_id": payload.product_id }),
    )
    .await;

    Ok(respond(format!("Item added to {}", kind.policy().label), items))
}

/// Sets the quantity of an existing cart entry.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CollectionList>> {
    let quantity = validate_quantity(payload.quantity)?;

    let orm = state.orm().await?;
    let txn = orm.begin().await?;
    lock_owner(&txn, user.user_id).await?;

    let entry = CollectionItems::find()
        .filter(EntryCol::UserId.eq(user.user_id))
        .filter(EntryCol::Collection.eq(CollectionKind::Cart.as_str()))
        .filter(EntryCol::ProductId.eq(product_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found in cart".into()))?;

    let mut active: EntryActive = entry.into();
    active.quantity = Set(Some(quantity));
    active.update(&txn).await?;

    let items = populated(&txn, user.user_id, CollectionKind::Cart).await?;
    txn.commit().await?;

    audit::record(
        &orm,
        Some(user.user_id),
        "cart_quantity_update",
        "user_collection_items",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    Ok(respond("Cart updated", items))
}

/// Removing an entry that is not there is not an error.
pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    kind: CollectionKind,
    product_id: Uuid,
) -> AppResult<ApiResponse<CollectionList>> {
    let orm = state.orm().await?;
    let txn = orm.begin().await?;
    lock_owner(&txn, user.user_id).await?;

    let result = CollectionItems::delete_many()
        .filter(EntryCol::UserId.eq(user.user_id))
        .filter(EntryCol::Collection.eq(kind.as_str()))
        .filter(EntryCol::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    let items = populated(&txn, user.user_id, kind).await?;
    txn.commit().await?;

    if result.rows_affected > 0 {
        audit::record(
            &orm,
            Some(user.user_id),
            "collection_remove",
            "user_collection_items",
            serde_json::json!({ "collection": kind, "product_id": product_id }),
        )
        .await;
    }

    Ok(respond(format!("Item removed from {}", kind.policy().label), items))
}

pub async fn clear_collection(
    state: &AppState,
    user: &AuthUser,
    kind: CollectionKind,
) -> AppResult<ApiResponse<CollectionList>> {
    let orm = state.orm().await?;
    let txn = orm.begin().await?;
    lock_owner(&txn, user.user_id).await?;

    let result = CollectionItems::delete_many()
        .filter(EntryCol::UserId.eq(user.user_id))
        .filter(EntryCol::Collection.eq(kind.as_str()))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, collection = kind.as_str(), removed = result.rows_affected, "collection cleared");
    audit::record(
        &orm,
        Some(user.user_id),
        "collection_clear",
        "user_collection_items",
        serde_json::json!({ "collection": kind, "removed": result.rows_affected }),
    )
    .await;

    Ok(respond(format!("{} cleared", capitalize(kind.policy().label)), Vec::new()))
}

// Serializes every mutation of one user's collections.
async fn lock_owner(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<()> {
    Users::find_by_id(user_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .map(|_| ())
        .ok_or_else(user_not_found)
}

async fn stored_entries<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    kind: CollectionKind,
) -> AppResult<Vec<EntryModel>> {
    let entries = CollectionItems::find()
        .filter(EntryCol::UserId.eq(user_id))
        .filter(EntryCol::Collection.eq(kind.as_str()))
        .order_by_asc(EntryCol::Position)
        .all(conn)
        .await?;
    Ok(entries)
}

async fn populated<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    kind: CollectionKind,
) -> AppResult<Vec<CollectionEntry>> {
    let rows = CollectionItems::find()
        .filter(EntryCol::UserId.eq(user_id))
        .filter(EntryCol::Collection.eq(kind.as_str()))
        .order_by_asc(EntryCol::Position)
        .find_also_related(Products)
        .all(conn)
        .await?;
    populate(rows)
}

/// Joins entries with their products, dropping entries whose product is gone.
pub(crate) fn populate(
    rows: Vec<(EntryModel, Option<ProductModel>)>,
) -> AppResult<Vec<CollectionEntry>> {
    rows.into_iter()
        .filter_map(|(entry, product)| product.map(|product| (entry, product)))
        .map(|(entry, product)| {
            Ok(CollectionEntry {
                product: Product::try_from(product)?,
                quantity: entry.quantity,
                added_at: entry.added_at.with_timezone(&Utc),
            })
        })
        .collect()
}

fn respond(message: impl Into<String>, items: Vec<CollectionEntry>) -> ApiResponse<CollectionList> {
    let meta = Meta::total(items.len());
    ApiResponse::success(message, CollectionList { items }, Some(meta))
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
