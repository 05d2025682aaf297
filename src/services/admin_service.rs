use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CustomerName, DashboardStats, OrderList, RecentOrder, StoreCounts, UpdateOrderStatusRequest,
    },
    entity::{
        Users,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service::load_orders,
    state::AppState,
};

const RECENT_ORDERS: u64 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id);

    let orm = state.orm().await?;
    let total = finder.clone().count(&orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&orm)
        .await?;
    let items = load_orders(&orm, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Any status may follow any other; only the value itself is checked.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status = OrderStatus::parse(&payload.status)?;

    let orm = state.orm().await?;
    let existing = Orders::find_by_id(id)
        .one(&orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let previous = existing.status.clone();

    let mut active: OrderActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&orm).await?;
    tracing::info!(order_id = %id, from = %previous, to = status.as_str(), "order status updated");

    audit::record(
        &orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": previous, "to": status }),
    )
    .await;

    let order = load_orders(&orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    Ok(ApiResponse::success("Order status updated", order, Some(Meta::empty())))
}

pub async fn dashboard_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;
    let orm = state.orm().await?;

    let stats = StoreCounts {
        total_products: Products::find().count(&orm).await?,
        total_users: Users::find()
            .filter(UserCol::Role.eq(Role::User.as_str()))
            .count(&orm)
            .await?,
        total_orders: Orders::find().count(&orm).await?,
        out_of_stock: Products::find()
            .filter(ProdCol::Stock.lte(0))
            .count(&orm)
            .await?,
    };

    let (models, customers): (Vec<_>, Vec<_>) = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id)
        .limit(RECENT_ORDERS)
        .find_also_related(Users)
        .all(&orm)
        .await?
        .into_iter()
        .unzip();

    let recent_orders = load_orders(&orm, models)
        .await?
        .into_iter()
        .zip(customers)
        .map(|(order, customer)| RecentOrder {
            order,
            customer: customer.map(|u| CustomerName {
                first_name: u.first_name,
                last_name: u.last_name,
            }),
        })
        .collect();

    Ok(ApiResponse::success(
        "Dashboard stats",
        DashboardStats { stats, recent_orders },
        Some(Meta::empty()),
    ))
}
