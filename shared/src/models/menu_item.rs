//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named price option (a size or an extra ingredient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraPrice {
    /// Assigned by the server when missing on create/update
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub price: Decimal,
}

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub branch_id: i64,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub sizes: Vec<ExtraPrice>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub extra_ingredient_prices: Vec<ExtraPrice>,
    pub is_available: bool,
    /// Percent, 0..=100
    pub discount: Decimal,
    /// Stored copy of [`discounted_price`] for `base_price` and `discount`
    pub discounted_price: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MenuItem {
    pub fn size(&self, id: i64) -> Option<&ExtraPrice> {
        self.sizes.iter().find(|s| s.id == id)
    }

    pub fn extra(&self, id: i64) -> Option<&ExtraPrice> {
        self.extra_ingredient_prices.iter().find(|e| e.id == id)
    }
}

/// Price after applying a percent discount, rounded to cents.
///
/// A zero (or negative) discount leaves the base price unchanged.
pub fn discounted_price(base_price: Decimal, discount: Decimal) -> Decimal {
    if discount > Decimal::ZERO {
        (base_price * (Decimal::ONE - discount / Decimal::ONE_HUNDRED)).round_dp(2)
    } else {
        base_price
    }
}

/// Create / full-update menu item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub branch_id: i64,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub sizes: Vec<ExtraPrice>,
    #[serde(default)]
    pub extra_ingredient_prices: Vec<ExtraPrice>,
    pub is_available: Option<bool>,
    pub discount: Option<Decimal>,
}

/// PATCH /api/menu-items/{id}/availability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub available: bool,
}

/// PUT /api/menu-items/{id}/discount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountUpdate {
    pub discount: Decimal,
}
