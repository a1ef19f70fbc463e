//! Cart pricing using rust_decimal
//!
//! The client only names items, sizes and extras; every price is taken from
//! the stored menu item so a tampered cart cannot change what is charged.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{CartItemRequest, CartLine, MenuItem, discounted_price};

/// Maximum allowed quantity per cart line
const MAX_QUANTITY: u32 = 99;

/// Priced cart ready to be frozen into an order
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<CartLine>,
    /// Sum of all lines, without delivery
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Unit price of an item with the chosen size and extras
fn unit_price(item: &MenuItem, request: &CartItemRequest) -> Result<CartLine, AppError> {
    let size = match request.size_id {
        Some(size_id) => Some(item.size(size_id).cloned().ok_or_else(|| {
            AppError::new(ErrorCode::SizeNotFound)
                .with_detail("menu_item_id", item.id)
                .with_detail("size_id", size_id)
        })?),
        None => None,
    };

    let extras = request
        .extra_ids
        .iter()
        .map(|&extra_id| {
            item.extra(extra_id).cloned().ok_or_else(|| {
                AppError::new(ErrorCode::ExtraNotFound)
                    .with_detail("menu_item_id", item.id)
                    .with_detail("extra_id", extra_id)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let base = discounted_price(item.base_price, item.discount);
    let unit = base
        + size.as_ref().map_or(Decimal::ZERO, |s| s.price)
        + extras.iter().map(|e| e.price).sum::<Decimal>();

    let quantity = request.quantity.unwrap_or(1);
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}, got {quantity}"
        )));
    }

    Ok(CartLine {
        menu_item_id: item.id,
        name: item.name.clone(),
        size,
        extras,
        quantity,
        unit_price: unit.round_dp(2),
    })
}

/// Price a cart against the menu items loaded for it.
///
/// Every line must reference an available item of `branch_id`.
pub fn price_cart(
    branch_id: i64,
    requests: &[CartItemRequest],
    items: &[MenuItem],
    delivery_fee: Decimal,
) -> Result<PricedCart, AppError> {
    if requests.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }

    let by_id: HashMap<i64, &MenuItem> = items.iter().map(|item| (item.id, item)).collect();

    let mut lines = Vec::with_capacity(requests.len());
    for request in requests {
        let item = by_id
            .get(&request.menu_item_id)
            .copied()
            .filter(|item| item.branch_id == branch_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::MenuItemNotFound)
                    .with_detail("menu_item_id", request.menu_item_id)
            })?;
        if !item.is_available {
            return Err(AppError::new(ErrorCode::MenuItemUnavailable)
                .with_detail("menu_item_id", item.id));
        }
        lines.push(unit_price(item, request)?);
    }

    let subtotal: Decimal = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();

    Ok(PricedCart {
        total: subtotal + delivery_fee,
        lines,
        subtotal,
        delivery_fee,
    })
}

/// Delivery fee from its configured cent amount
pub fn fee_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
