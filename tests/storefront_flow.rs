use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use sst_storefront_api::{
    collection::CollectionKind,
    db::{Store, create_orm_conn, run_migrations},
    dto::{
        auth::{LoginRequest, SignupRequest},
        collections::{AddItemRequest, UpdateQuantityRequest},
        orders::{OrderItemRequest, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::CreateProductRequest,
    },
    entity::{AuditLogs, CollectionItems, Products, audit_logs, collection_items},
    error::AppError,
    middleware::auth::{AuthUser, JwtKeys},
    models::{Category, OrderStatus, PaymentMethod, Product, Role, ShippingAddress, Specifications},
    routes::params::{OrderListQuery, ProductQuery},
    services::{admin_service, auth_service, collection_service, order_service, product_service},
    state::AppState,
};
use std::time::Duration;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

// Runs against a real PostgreSQL; skipped unless TEST_DATABASE_URL or DATABASE_URL is set.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run storefront flow tests.");
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url, Duration::from_secs(10)).await?;
    // Parallel tests share one schema; migrate once per binary.
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;
    let state = AppState::new(Store::from_connection(orm), JwtKeys::new("flow-test-secret", 1));
    Ok(Some(state))
}

async fn signup_user(state: &AppState) -> anyhow::Result<AuthUser> {
    let tag = &Uuid::new_v4().simple().to_string()[..10];
    let user = auth_service::signup(
        state,
        SignupRequest {
            username: format!("user_{tag}"),
            first_name: "Test".into(),
            last_name: "Buyer".into(),
            email: format!("{tag}@example.com"),
            password: "secret-pass".into(),
        },
    )
    .await?
    .data
    .expect("user");
    Ok(AuthUser { user_id: user.id, role: Role::User })
}

fn admin() -> AuthUser {
    AuthUser { user_id: Uuid::new_v4(), role: Role::Admin }
}

async fn create_product(
    state: &AppState,
    name: &str,
    category: Category,
    price: i64,
    stock: i32,
) -> anyhow::Result<Product> {
    let product = product_service::create_product(
        state,
        &admin(),
        CreateProductRequest {
            name: name.into(),
            brand: None,
            price,
            original_price: price + 40,
            images: vec![format!("https://img.example/{}.jpg", Uuid::new_v4())],
            category,
            description: format!("{name} for tests"),
            specifications: Specifications::default(),
            features: vec![],
            stock: Some(stock),
            unit: None,
            minimum_order: None,
            rating: Some(4.0),
        },
    )
    .await?
    .data
    .expect("product");
    Ok(product)
}

fn add(product_id: Uuid, quantity: Option<i32>) -> AddItemRequest {
    AddItemRequest { product_id, quantity }
}

async fn items(state: &AppState, user: &AuthUser, kind: CollectionKind) -> anyhow::Result<Vec<(Uuid, Option<i32>)>> {
    let list = collection_service::get_collection(state, user, kind)
        .await?
        .data
        .expect("collection");
    Ok(list.items.iter().map(|e| (e.product.id, e.quantity)).collect())
}

#[tokio::test]
async fn wishlist_rejects_duplicates_and_tolerates_missing_removals() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;
    let product = create_product(&state, "Twill Tape 20mm", Category::TwillTapes, 195, 10).await?;

    collection_service::add_item(&state, &user, CollectionKind::Wishlist, add(product.id, None)).await?;
    let second =
        collection_service::add_item(&state, &user, CollectionKind::Wishlist, add(product.id, None)).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(items(&state, &user, CollectionKind::Wishlist).await?, vec![(product.id, None)]);

    let removed = collection_service::remove_item(&state, &user, CollectionKind::Wishlist, Uuid::new_v4())
        .await?
        .data
        .expect("wishlist");
    assert_eq!(removed.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn compare_list_holds_three_products() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;

    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(create_product(&state, &format!("Compare Wick {i}"), Category::Wicks, 100 + i, 5).await?.id);
    }
    for id in &ids[..3] {
        collection_service::add_item(&state, &user, CollectionKind::Compare, add(*id, None)).await?;
    }
    let fourth = collection_service::add_item(&state, &user, CollectionKind::Compare, add(ids[3], None)).await;
    assert!(matches!(fourth, Err(AppError::CapacityExceeded(_))));

    let stored = items(&state, &user, CollectionKind::Compare).await?;
    assert_eq!(stored.iter().map(|(id, _)| *id).collect::<Vec<_>>(), ids[..3].to_vec());

    collection_service::clear_collection(&state, &user, CollectionKind::Compare).await?;
    assert!(items(&state, &user, CollectionKind::Compare).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn cart_quantities_accumulate_and_validate() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;
    let product = create_product(&state, "Elastic Tape 12mm", Category::ElasticTapes, 240, 20).await?;

    collection_service::add_item(&state, &user, CollectionKind::Cart, add(product.id, Some(2))).await?;
    collection_service::add_item(&state, &user, CollectionKind::Cart, add(product.id, Some(3))).await?;
    assert_eq!(items(&state, &user, CollectionKind::Cart).await?, vec![(product.id, Some(5))]);

    let zero = collection_service::update_quantity(
        &state,
        &user,
        product.id,
        UpdateQuantityRequest { quantity: 0 },
    )
    .await;
    assert!(matches!(zero, Err(AppError::InvalidArgument(_))));
    assert_eq!(items(&state, &user, CollectionKind::Cart).await?, vec![(product.id, Some(5))]);

    let missing = collection_service::update_quantity(
        &state,
        &user,
        Uuid::new_v4(),
        UpdateQuantityRequest { quantity: 2 },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    collection_service::update_quantity(&state, &user, product.id, UpdateQuantityRequest { quantity: 7 }).await?;
    assert_eq!(items(&state, &user, CollectionKind::Cart).await?, vec![(product.id, Some(7))]);
    Ok(())
}

#[tokio::test]
async fn deleted_products_drop_out_of_the_cart_but_stay_stored() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;
    let keep = create_product(&state, "Binding Tape 25mm", Category::BindingTapes, 180, 9).await?;
    let doomed = create_product(&state, "Fabric Tape 30mm", Category::FabricTapes, 165, 9).await?;

    collection_service::add_item(&state, &user, CollectionKind::Cart, add(keep.id, None)).await?;
    collection_service::add_item(&state, &user, CollectionKind::Cart, add(doomed.id, None)).await?;
    product_service::delete_product(&state, &admin(), doomed.id).await?;

    assert_eq!(items(&state, &user, CollectionKind::Cart).await?, vec![(keep.id, Some(1))]);

    let orm = state.orm().await?;
    let stored = CollectionItems::find()
        .filter(collection_items::Column::UserId.eq(user.user_id))
        .filter(collection_items::Column::ProductId.eq(doomed.id))
        .count(&orm)
        .await?;
    assert_eq!(stored, 1);
    Ok(())
}

#[tokio::test]
async fn catalog_query_combines_filters() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let cheap = create_product(&state, "Cotton Wicks Round 3mm", Category::CottonWicks, 150, 5).await?;
    let dear = create_product(&state, "Cotton Wicks Flat 5mm", Category::CottonWicks, 320, 5).await?;

    let list = product_service::list_products(
        &state,
        ProductQuery {
            category: Some("Cotton Wicks".into()),
            min_price: Some("200".into()),
            ..ProductQuery::default()
        },
    )
    .await?
    .data
    .expect("products");
    assert!(list.items.iter().all(|p| p.category == Category::CottonWicks && p.price >= 200));
    assert!(list.items.iter().any(|p| p.id == dear.id));
    assert!(!list.items.iter().any(|p| p.id == cheap.id));

    let all = product_service::list_products(&state, ProductQuery::default())
        .await?
        .data
        .expect("products");
    assert!(all.items.iter().any(|p| p.id == cheap.id));
    Ok(())
}

#[tokio::test]
async fn placing_an_order_takes_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;
    let product = create_product(&state, "Herringbone Tape 15mm", Category::HerringboneTapes, 210, 10).await?;

    let order = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![OrderItemRequest { product_id: product.id, quantity: 2 }],
            total: 999,
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Upi,
            coupon_code: None,
            discount: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(order.total, 999);
    assert_eq!(order.items[0].name, product.name);
    assert_eq!(order.items[0].price, 210);

    let orm = state.orm().await?;
    let stock = Products::find_by_id(product.id).one(&orm).await?.expect("product").stock;
    assert_eq!(stock, 8);

    let too_many = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![OrderItemRequest { product_id: product.id, quantity: 9 }],
            total: 1890,
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            discount: None,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::InvalidArgument(_))));
    let stock = Products::find_by_id(product.id).one(&orm).await?.expect("product").stock;
    assert_eq!(stock, 8);

    let orders = order_service::list_orders(&state, &user).await?.data.expect("orders");
    assert_eq!(orders.items.len(), 1);
    assert!(orders.items[0].items[0].product.is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_orders_cannot_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let first = signup_user(&state).await?;
    let second = signup_user(&state).await?;
    let product = create_product(&state, "Elastic Tape 20mm", Category::ElasticTapes, 285, 3).await?;

    let order = |user: AuthUser| {
        let state = state.clone();
        async move {
            order_service::place_order(
                &state,
                &user,
                PlaceOrderRequest {
                    items: vec![OrderItemRequest { product_id: product.id, quantity: 2 }],
                    total: 570,
                    shipping_address: ShippingAddress::default(),
                    payment_method: PaymentMethod::Card,
                    coupon_code: None,
                    discount: None,
                },
            )
            .await
        }
    };
    let (a, b) = tokio::join!(order(first), order(second));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let orm = state.orm().await?;
    let stock = Products::find_by_id(product.id).one(&orm).await?.expect("product").stock;
    assert_eq!(stock, 1);
    Ok(())
}

#[tokio::test]
async fn login_accepts_username_or_email() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let tag = &Uuid::new_v4().simple().to_string()[..10];
    auth_service::signup(
        &state,
        SignupRequest {
            username: format!("login_{tag}"),
            first_name: "Kavya".into(),
            last_name: "R".into(),
            email: format!("Login.{tag}@Example.com"),
            password: "secret-pass".into(),
        },
    )
    .await?;

    let by_email = auth_service::login(
        &state,
        LoginRequest { username: format!("login.{tag}@example.com"), password: "secret-pass".into() },
    )
    .await?
    .data
    .expect("login");
    let verified = state.jwt.verify(&by_email.token)?;
    assert_eq!(verified.user_id, by_email.user.id);

    let wrong = auth_service::login(
        &state,
        LoginRequest { username: format!("login_{tag}"), password: "nope-nope".into() },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let taken = auth_service::signup(
        &state,
        SignupRequest {
            username: format!("other_{tag}"),
            first_name: "Kavya".into(),
            last_name: "R".into(),
            email: format!("login.{tag}@example.com"),
            password: "secret-pass".into(),
        },
    )
    .await;
    assert!(matches!(taken, Err(AppError::Conflict(msg)) if msg == "Email already exists"));
    Ok(())
}

fn status(value: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest { status: value.into() }
}

#[tokio::test]
async fn admin_moves_order_status_freely() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else { return Ok(()) };
    let user = signup_user(&state).await?;
    let admin = admin();
    let product = create_product(&state, "Twill Tape 25mm", Category::TwillTapes, 205, 6).await?;

    let order = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![OrderItemRequest { product_id: product.id, quantity: 1 }],
            total: 205,
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Cod,
            coupon_code: None,
            discount: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(order.status, OrderStatus::Pending);

    let orm = state.orm().await?;
    let placed = AuditLogs::find()
        .filter(audit_logs::Column::Action.eq("order_place"))
        .filter(audit_logs::Column::UserId.eq(user.user_id))
        .count(&orm)
        .await?;
    assert_eq!(placed, 1);

    let delivered = admin_service::update_order_status(&state, &admin, order.id, status("delivered"))
        .await?
        .data
        .expect("order");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(delivered.items.len(), 1);

    let listed = admin_service::list_all_orders(
        &state,
        &admin,
        OrderListQuery { page: Some(1), per_page: Some(100), status: Some("delivered".into()) },
    )
    .await?
    .data
    .expect("orders");
    assert!(listed.items.iter().all(|o| o.status == OrderStatus::Delivered));
    assert!(listed.items.iter().any(|o| o.id == order.id));

    let back = admin_service::update_order_status(&state, &admin, order.id, status("pending"))
        .await?
        .data
        .expect("order");
    assert_eq!(back.status, OrderStatus::Pending);

    let unknown = admin_service::update_order_status(&state, &admin, order.id, status("paid")).await;
    assert!(matches!(unknown, Err(AppError::InvalidArgument(_))));

    let missing =
        admin_service::update_order_status(&state, &admin, Uuid::new_v4(), status("shipped")).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let as_user = admin_service::update_order_status(&state, &user, order.id, status("shipped")).await;
    assert!(matches!(as_user, Err(AppError::Forbidden)));

    let pending = admin_service::list_all_orders(
        &state,
        &admin,
        OrderListQuery { page: Some(1), per_page: Some(100), status: Some("pending".into()) },
    )
    .await?
    .data
    .expect("orders");
    assert!(pending.items.iter().any(|o| o.id == order.id));
    Ok(())
}
