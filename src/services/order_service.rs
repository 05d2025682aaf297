use std::collections::{BTreeMap, HashMap};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderItemRequest, OrderList, PlaceOrderRequest},
    entity::{
        Users,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderLine, OrderStatus, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Places an order and takes its quantities out of stock in one transaction.
///
/// Product rows are locked in id order, so concurrent orders for the same
/// products queue up instead of both passing the stock check.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    validate_order(&payload)?;
    let requested = merge_quantities(&payload.items)?;

    let orm = state.orm().await?;
    let txn = orm.begin().await?;

    if Users::find_by_id(user.user_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let mut locked: HashMap<Uuid, Product> = HashMap::new();
    for model in Products::find()
        .filter(ProdCol::Id.is_in(requested.keys().copied()))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
    {
        let product = Product::try_from(model)?;
        locked.insert(product.id, product);
    }
    check_stock(&requested, &locked)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total: Set(payload.total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        shipping_address: Set(serde_json::to_value(&payload.shipping_address)
            .map_err(|e| AppError::Internal(e.into()))?),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        coupon_code: Set(payload.coupon_code.filter(|c| !c.trim().is_empty())),
        discount: Set(payload.discount),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (product_id, quantity) in &requested {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .filter(ProdCol::Id.eq(*product_id))
            .exec(&txn)
            .await?;
        if let Some(product) = locked.get_mut(product_id) {
            product.stock -= *quantity;
        }
    }

    let mut lines = Vec::with_capacity(payload.items.len());
    for (position, item) in payload.items.iter().enumerate() {
        let product = locked
            .get(&item.product_id)
            .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
        let line = snapshot_line(product, item.quantity);
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            name: Set(line.name.clone()),
            price: Set(line.price),
            quantity: Set(line.quantity),
            image: Set(line.image.clone()),
            position: Set(position as i32),
        }
        .insert(&txn)
        .await?;
        lines.push(line);
    }

    txn.commit().await?;
    tracing::info!(order_id = %order.id, user_id = %user.user_id, lines = lines.len(), "order placed");

    audit::record(
        &orm,
        Some(user.user_id),
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed successfully",
        Order::from_entity(order, lines)?,
        Some(Meta::empty()),
    ))
}

/// The caller's orders, newest first.
pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orm = state.orm().await?;
    let models = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id)
        .all(&orm)
        .await?;

    let items = load_orders(&orm, models).await?;
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Attaches lines, with their live products, to `models`, keeping their order.
pub(crate) async fn load_orders<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(models.iter().map(|o| o.id)))
        .order_by_asc(OrderItemCol::OrderId)
        .order_by_asc(OrderItemCol::Position)
        .find_also_related(Products)
        .all(conn)
        .await?;

    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for (item, product) in rows {
        let order_id = item.order_id;
        let mut line = OrderLine::from(item);
        line.product = product.map(Product::try_from).transpose()?;
        lines.entry(order_id).or_default().push(line);
    }

    models
        .into_iter()
        .map(|model| {
            let items = lines.remove(&model.id).unwrap_or_default();
            Order::from_entity(model, items)
        })
        .collect()
}

fn validate_order(payload: &PlaceOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::InvalidArgument("Order must contain at least one item".into()));
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        return Err(AppError::InvalidArgument("Quantity must be at least 1".into()));
    }
    if payload.total < 0 {
        return Err(AppError::InvalidArgument("total must not be negative".into()));
    }
    if payload.discount.is_some_and(|d| d < 0) {
        return Err(AppError::InvalidArgument("discount must not be negative".into()));
    }
    Ok(())
}

/// Sums quantities per product; the map's key order is the lock order.
pub(crate) fn merge_quantities(items: &[OrderItemRequest]) -> AppResult<BTreeMap<Uuid, i32>> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        let slot = merged.entry(item.product_id).or_insert(0);
        *slot = slot
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::InvalidArgument("Quantity is too large".into()))?;
    }
    Ok(merged)
}

pub(crate) fn check_stock(
    requested: &BTreeMap<Uuid, i32>,
    available: &HashMap<Uuid, Product>,
) -> AppResult<()> {
    for (product_id, quantity) in requested {
        let product = available
            .get(product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found")))?;
        if product.stock < *quantity {
            return Err(AppError::InvalidArgument(format!(
                "Insufficient stock for {}: requested {}, available {}",
                product.name, quantity, product.stock
            )));
        }
    }
    Ok(())
}

fn snapshot_line(product: &Product, quantity: i32) -> OrderLine {
    OrderLine {
        product_id: product.id,
        name: product.name.clone(),
        price: product.price,
        quantity,
        image: product.images.first().cloned(),
        product: Some(product.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, PaymentMethod, ShippingAddress, Specifications, Unit};
    use chrono::Utc;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Cotton Twill Tape".into(),
            brand: "Sri Saravana Textile".into(),
            price: 195,
            original_price: 230,
            images: vec!["https://img.example/twill-1.jpg".into(), "https://img.example/twill-2.jpg".into()],
            category: Category::TwillTapes,
            description: String::new(),
            specifications: Specifications::default(),
            features: vec![],
            stock,
            unit: Unit::Kg,
            minimum_order: 1,
            rating: 4.6,
            reviews: vec![],
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn request(items: Vec<OrderItemRequest>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items,
            total: 390,
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            discount: None,
        }
    }

    fn item(product_id: Uuid, quantity: i32) -> OrderItemRequest {
        OrderItemRequest { product_id, quantity }
    }

    #[test]
    fn empty_or_non_positive_orders_are_rejected() {
        assert!(matches!(validate_order(&request(vec![])), Err(AppError::InvalidArgument(_))));
        let zero = request(vec![item(Uuid::new_v4(), 0)]);
        assert!(matches!(validate_order(&zero), Err(AppError::InvalidArgument(_))));

        let mut negative = request(vec![item(Uuid::new_v4(), 1)]);
        negative.total = -1;
        assert!(matches!(validate_order(&negative), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn repeated_products_are_summed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_quantities(&[item(a, 2), item(b, 1), item(a, 3)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&a], 5);
        assert_eq!(merged[&b], 1);
    }

    #[test]
    fn summed_quantity_overflow_is_rejected() {
        let a = Uuid::new_v4();
        let err = merge_quantities(&[item(a, i32::MAX), item(a, 1)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn stock_check_uses_summed_quantities() {
        let p = product(4);
        let available = HashMap::from([(p.id, p.clone())]);

        let fits = merge_quantities(&[item(p.id, 2), item(p.id, 2)]).unwrap();
        assert!(check_stock(&fits, &available).is_ok());

        let too_many = merge_quantities(&[item(p.id, 2), item(p.id, 3)]).unwrap();
        let err = check_stock(&too_many, &available).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(msg) if msg.starts_with("Insufficient stock")));
    }

    #[test]
    fn missing_product_is_not_found() {
        let requested = BTreeMap::from([(Uuid::new_v4(), 1)]);
        let err = check_stock(&requested, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn snapshot_copies_name_price_and_first_image() {
        let p = product(10);
        let line = snapshot_line(&p, 2);
        assert_eq!(line.name, p.name);
        assert_eq!(line.price, 195);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.image.as_deref(), Some("https://img.example/twill-1.jpg"));
    }
}
