use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    collection::CollectionKind,
    dto::{
        auth::{AdminLoginResponse, LoginRequest, LoginResponse, SignupRequest},
        collections::{AddItemRequest, CollectionEntry, CollectionList, UpdateQuantityRequest},
        orders::{
            CustomerName, DashboardStats, OrderItemRequest, OrderList, PlaceOrderRequest,
            RecentOrder, StoreCounts, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, FilterRequest, ProductList, UpdateProductRequest},
    },
    models::{
        Admin, Category, Order, OrderLine, OrderStatus, PaymentMethod, Product, Review, Role,
        ShippingAddress, Specifications, Unit, User,
    },
    response::{ApiResponse, ErrorResponse, Meta},
    routes::{admin, auth, collections, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::admin_login,
        products::list_products,
        products::get_product,
        products::search_products,
        products::filter_products,
        collections::get_collection,
        collections::add_item,
        collections::clear_collection,
        collections::remove_item,
        collections::update_cart_quantity,
        orders::place_order,
        orders::list_orders,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::dashboard_stats,
        admin::list_all_orders,
        admin::update_order_status
    ),
    components(
        schemas(
            User,
            Admin,
            Role,
            Product,
            Category,
            Unit,
            Specifications,
            Review,
            Order,
            OrderLine,
            OrderStatus,
            PaymentMethod,
            ShippingAddress,
            CollectionKind,
            SignupRequest,
            LoginRequest,
            LoginResponse,
            AdminLoginResponse,
            AddItemRequest,
            UpdateQuantityRequest,
            CollectionEntry,
            CollectionList,
            CreateProductRequest,
            UpdateProductRequest,
            FilterRequest,
            ProductList,
            OrderItemRequest,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            StoreCounts,
            CustomerName,
            RecentOrder,
            DashboardStats,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ErrorResponse,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CollectionList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<DashboardStats>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup and login for users and admins"),
        (name = "Products", description = "Catalog listing, search and filtering"),
        (name = "Collections", description = "Per-user cart, wishlist and compare list"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Catalog management, order status and dashboard"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
