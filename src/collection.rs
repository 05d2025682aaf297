//! Rules shared by the three per-user product lists.
//!
//! Cart, wishlist and compare differ only in whether they track a quantity,
//! whether they reject duplicates and how many entries they may hold. Those
//! differences live in [`CollectionPolicy`]; [`plan_add`] applies them to the
//! current entries and decides what an add should do, without touching the
//! database.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::collection_items::Model as EntryModel,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Cart,
    Wishlist,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPolicy {
    /// Name used in user-facing messages.
    pub label: &'static str,
    pub tracks_quantity: bool,
    pub rejects_duplicates: bool,
    pub capacity: Option<usize>,
}

pub const COMPARE_CAPACITY: usize = 3;

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Cart,
        CollectionKind::Wishlist,
        CollectionKind::Compare,
    ];

    pub const fn policy(self) -> CollectionPolicy {
        match self {
            CollectionKind::Cart => CollectionPolicy {
                label: "cart",
                tracks_quantity: true,
                rejects_duplicates: false,
                capacity: None,
            },
            CollectionKind::Wishlist => CollectionPolicy {
                label: "wishlist",
                tracks_quantity: false,
                rejects_duplicates: true,
                capacity: None,
            },
            CollectionKind::Compare => CollectionPolicy {
                label: "compare list",
                tracks_quantity: false,
                rejects_duplicates: true,
                capacity: Some(COMPARE_CAPACITY),
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Cart => "cart",
            CollectionKind::Wishlist => "wishlist",
            CollectionKind::Compare => "compare",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AppError::NotFound(format!("Unknown collection '{value}'")))
    }
}

/// Outcome of an add, decided against the entries currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPlan {
    /// Append a new entry.
    Insert { quantity: Option<i32> },
    /// Overwrite the quantity of `entries[index]`.
    Increment { index: usize, quantity: i32 },
}

pub fn validate_quantity(quantity: i32) -> AppResult<i32> {
    if quantity < 1 {
        return Err(AppError::InvalidArgument(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(quantity)
}

/// Decide how adding `product_id` changes a collection holding `entries`.
///
/// Capacity is checked before duplicates, and counts every stored entry,
/// including ones whose product has since been deleted.
pub fn plan_add(
    kind: CollectionKind,
    entries: &[EntryModel],
    product_id: Uuid,
    requested: Option<i32>,
) -> AppResult<AddPlan> {
    let policy = kind.policy();
    let existing = entries.iter().position(|e| e.product_id == product_id);

    if policy.tracks_quantity {
        let amount = validate_quantity(requested.unwrap_or(1))?;
        return match existing {
            Some(index) => {
                let current = entries[index].quantity.unwrap_or(0);
                let quantity = current.checked_add(amount).ok_or_else(|| {
                    AppError::InvalidArgument("Quantity is too large".to_string())
                })?;
                Ok(AddPlan::Increment { index, quantity })
            }
            None => Ok(AddPlan::Insert {
                quantity: Some(amount),
            }),
        };
    }

    if let Some(capacity) = policy.capacity {
        if entries.len() >= capacity {
            return Err(AppError::CapacityExceeded(format!(
                "Compare list is full. Maximum {capacity} items allowed."
            )));
        }
    }

    if policy.rejects_duplicates && existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Item already in {}",
            policy.label
        )));
    }

    Ok(AddPlan::Insert { quantity: None })
}
