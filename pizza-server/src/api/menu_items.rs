use axum::Json;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityUpdate, DiscountUpdate, ExtraPrice, MenuItem, MenuItemCreate, discounted_price,
};

use super::{ApiResult, BranchQuery};
use crate::auth::{CurrentUser, menu_scope};
use crate::db;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};

fn item_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::MenuItemNotFound).with_detail("id", id)
}

fn check_discount(discount: Decimal) -> Result<Decimal, AppError> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(AppError::new(ErrorCode::InvalidDiscount).with_detail("discount", discount.to_string()));
    }
    Ok(discount)
}

fn check_price(field: &str, price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::new(ErrorCode::MenuItemInvalidPrice).with_detail(field, price.to_string()));
    }
    Ok(())
}

/// Assign ids to new options and reject negative prices
fn normalize_options(field: &str, options: Vec<ExtraPrice>) -> Result<Vec<ExtraPrice>, AppError> {
    options
        .into_iter()
        .map(|mut option| {
            check_price(field, option.price)?;
            if option.id == 0 {
                option.id = snowflake_id();
            }
            Ok(option)
        })
        .collect()
}

/// Build the stored item from a create/update payload
fn build_item(
    id: i64,
    branch_id: i64,
    data: MenuItemCreate,
    created_at: i64,
    now: i64,
) -> Result<MenuItem, AppError> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::with_message(ErrorCode::RequiredField, "Menu item name is required"));
    }
    check_price("base_price", data.base_price)?;
    let discount = check_discount(data.discount.unwrap_or(Decimal::ZERO))?;

    Ok(MenuItem {
        id,
        branch_id,
        category_id: data.category_id,
        image: data.image,
        name,
        description: data.description,
        base_price: data.base_price,
        sizes: normalize_options("sizes", data.sizes)?,
        extra_ingredient_prices: normalize_options("extra_ingredient_prices", data.extra_ingredient_prices)?,
        is_available: data.is_available.unwrap_or(true),
        discount,
        discounted_price: discounted_price(data.base_price, discount),
        created_at,
        updated_at: now,
    })
}

async fn load(state: &AppState, id: i64) -> Result<MenuItem, ServiceError> {
    Ok(db::menu_items::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| item_not_found(id))?)
}

/// A category, when given, must belong to the item's branch
async fn check_category(state: &AppState, category_id: Option<i64>, branch_id: i64) -> Result<(), ServiceError> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    match db::categories::find_by_id(&state.pool, category_id).await? {
        Some(category) if category.branch_id == branch_id => Ok(()),
        _ => Err(AppError::new(ErrorCode::CategoryNotFound)
            .with_detail("id", category_id)
            .into()),
    }
}

pub async fn list_menu_items(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Vec<MenuItem>> {
    let scope = menu_scope(current.as_ref().map(|c| &c.actor), query.branch_id);
    let items = db::menu_items::list(&state.pool, scope).await?;
    Ok(Json(items))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<MenuItem> {
    Ok(Json(load(&state, id).await?))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(data): Json<MenuItemCreate>,
) -> ApiResult<MenuItem> {
    let branch_id = data.branch_id;
    current.actor.require_administers(branch_id)?;
    check_category(&state, data.category_id, branch_id).await?;

    let now = now_millis();
    let item = build_item(snowflake_id(), branch_id, data, now, now)?;
    let item = db::menu_items::insert(&state.pool, &item).await?;
    tracing::info!(menu_item_id = item.id, branch_id, "Menu item created");
    Ok(Json(item))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<MenuItemCreate>,
) -> ApiResult<MenuItem> {
    let existing = load(&state, id).await?;
    current.actor.require_administers(existing.branch_id)?;
    check_category(&state, data.category_id, existing.branch_id).await?;

    let item = build_item(id, existing.branch_id, data, existing.created_at, now_millis())?;
    let item = db::menu_items::replace(&state.pool, &item)
        .await?
        .ok_or_else(|| item_not_found(id))?;
    Ok(Json(item))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    let existing = load(&state, id).await?;
    current.actor.require_administers(existing.branch_id)?;

    let deleted = db::menu_items::delete(&state.pool, id).await?;
    tracing::info!(menu_item_id = id, "Menu item deleted");
    Ok(Json(deleted))
}

pub async fn set_availability(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<AvailabilityUpdate>,
) -> ApiResult<MenuItem> {
    let existing = load(&state, id).await?;
    current.actor.require_manages_orders_of(existing.branch_id)?;

    let item = db::menu_items::set_availability(&state.pool, id, data.available, now_millis())
        .await?
        .ok_or_else(|| item_not_found(id))?;
    tracing::info!(menu_item_id = id, available = item.is_available, "Menu item availability changed");
    Ok(Json(item))
}

pub async fn set_discount(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<DiscountUpdate>,
) -> ApiResult<MenuItem> {
    let existing = load(&state, id).await?;
    current.actor.require_manages_orders_of(existing.branch_id)?;
    let discount = check_discount(data.discount)?;

    let item = db::menu_items::set_discount(
        &state.pool,
        id,
        discount,
        discounted_price(existing.base_price, discount),
        now_millis(),
    )
    .await?
    .ok_or_else(|| item_not_found(id))?;
    Ok(Json(item))
}
