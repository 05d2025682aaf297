use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{admins, order_items, orders, products, users},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::InvalidArgument(format!("Unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Tapes,
    Wicks,
    #[serde(rename = "Cotton Wicks")]
    CottonWicks,
    #[serde(rename = "Fabric Tapes")]
    FabricTapes,
    #[serde(rename = "Binding Tapes")]
    BindingTapes,
    #[serde(rename = "Elastic Tapes")]
    ElasticTapes,
    #[serde(rename = "Twill Tapes")]
    TwillTapes,
    #[serde(rename = "Herringbone Tapes")]
    HerringboneTapes,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Tapes,
        Category::Wicks,
        Category::CottonWicks,
        Category::FabricTapes,
        Category::BindingTapes,
        Category::ElasticTapes,
        Category::TwillTapes,
        Category::HerringboneTapes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tapes => "Tapes",
            Category::Wicks => "Wicks",
            Category::CottonWicks => "Cotton Wicks",
            Category::FabricTapes => "Fabric Tapes",
            Category::BindingTapes => "Binding Tapes",
            Category::ElasticTapes => "Elastic Tapes",
            Category::TwillTapes => "Twill Tapes",
            Category::HerringboneTapes => "Herringbone Tapes",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| AppError::InvalidArgument(format!("Unknown category '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Unit {
    #[default]
    Kg,
    Meters,
    Pieces,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "Kg",
            Unit::Meters => "Meters",
            Unit::Pieces => "Pieces",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "Kg" => Ok(Unit::Kg),
            "Meters" => Ok(Unit::Meters),
            "Pieces" => Ok(Unit::Pieces),
            other => Err(AppError::InvalidArgument(format!("Unknown unit '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(AppError::InvalidArgument("Invalid order status".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    #[default]
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Cod => "cod",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown payment method '{other}'"
            ))),
        }
    }
}

/// Public view of a user account. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<users::Model> for User {
    type Error = AppError;

    fn try_from(model: users::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            role: Role::parse(&model.role)?,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub shop_name: String,
}

impl From<admins::Model> for Admin {
    fn from(model: admins::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: Role::Admin,
            shop_name: model.shop_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Specifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Length available per unit of sale, e.g. "500 meters per kg".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensile_strength: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub washable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrinkage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gsm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weave: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub user: String,
    pub rating: f64,
    pub comment: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub original_price: i64,
    pub images: Vec<String>,
    pub category: Category,
    pub description: String,
    pub specifications: Specifications,
    pub features: Vec<String>,
    pub stock: i32,
    pub unit: Unit,
    pub minimum_order: i32,
    pub rating: f64,
    pub reviews: Vec<Review>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<products::Model> for Product {
    type Error = AppError;

    fn try_from(model: products::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            name: model.name,
            brand: model.brand,
            price: model.price,
            original_price: model.original_price,
            images: from_json(model.images, "images")?,
            category: Category::parse(&model.category)?,
            description: model.description,
            specifications: from_json(model.specifications, "specifications")?,
            features: from_json(model.features, "features")?,
            stock: model.stock,
            unit: Unit::parse(&model.unit)?,
            minimum_order: model.minimum_order,
            rating: model.rating,
            reviews: from_json(model.reviews, "reviews")?,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Order line as captured at placement time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub image: Option<String>,
    /// The live product; `null` once the product has been deleted.
    pub product: Option<Product>,
}

impl From<order_items::Model> for OrderLine {
    fn from(model: order_items::Model) -> Self {
        Self {
            product_id: model.product_id,
            name: model.name,
            price: model.price,
            quantity: model.quantity,
            image: model.image,
            product: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub total: i64,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub discount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn from_entity(model: orders::Model, items: Vec<OrderLine>) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            items,
            total: model.total,
            status: OrderStatus::parse(&model.status)?,
            shipping_address: from_json(model.shipping_address, "shipping_address")?,
            payment_method: PaymentMethod::parse(&model.payment_method)?,
            coupon_code: model.coupon_code,
            discount: model.discount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value, field: &str) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt {field} column: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip_through_serde() {
        for category in Category::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::json!(category.as_str()));
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn unknown_enum_values_are_invalid_arguments() {
        assert!(matches!(Category::parse("Ropes"), Err(AppError::InvalidArgument(_))));
        assert!(matches!(OrderStatus::parse("paid"), Err(AppError::InvalidArgument(_))));
        assert!(matches!(PaymentMethod::parse("cash"), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn specifications_skip_missing_fields() {
        let specs = Specifications {
            material: Some("100% Cotton".into()),
            tensile_strength: Some("150 N".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&specs).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "material": "100% Cotton", "tensileStrength": "150 N" })
        );
    }
}
