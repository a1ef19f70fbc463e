//! Menu item database operations
//!
//! Writes always receive the full item with `discounted_price` already
//! derived, so the stored copy never drifts from `base_price`/`discount`.

use rust_decimal::Decimal;
use shared::models::MenuItem;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::auth::MenuScope;

pub async fn list(pool: &PgPool, scope: MenuScope) -> Result<Vec<MenuItem>, sqlx::Error> {
    match scope {
        MenuScope::All => {
            sqlx::query_as("SELECT * FROM menu_items ORDER BY name")
                .fetch_all(pool)
                .await
        }
        MenuScope::Branch(branch_id) => {
            sqlx::query_as("SELECT * FROM menu_items WHERE branch_id = $1 ORDER BY name")
                .bind(branch_id)
                .fetch_all(pool)
                .await
        }
        MenuScope::Nothing => Ok(Vec::new()),
    }
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_many(pool: &PgPool, ids: &[i64]) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn insert(pool: &PgPool, item: &MenuItem) -> Result<MenuItem, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO menu_items (
            id, branch_id, category_id, image, name, description, base_price,
            sizes, extra_ingredient_prices, is_available, discount, discounted_price,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
        RETURNING *
        "#,
    )
    .bind(item.id)
    .bind(item.branch_id)
    .bind(item.category_id)
    .bind(&item.image)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.base_price)
    .bind(Json(&item.sizes))
    .bind(Json(&item.extra_ingredient_prices))
    .bind(item.is_available)
    .bind(item.discount)
    .bind(item.discounted_price)
    .bind(item.created_at)
    .fetch_one(pool)
    .await
}

/// Full replace of the editable fields. `branch_id` never moves.
pub async fn replace(pool: &PgPool, item: &MenuItem) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE menu_items SET
            category_id = $2, image = $3, name = $4, description = $5,
            base_price = $6, sizes = $7, extra_ingredient_prices = $8,
            is_available = $9, discount = $10, discounted_price = $11,
            updated_at = $12
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(item.id)
    .bind(item.category_id)
    .bind(&item.image)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.base_price)
    .bind(Json(&item.sizes))
    .bind(Json(&item.extra_ingredient_prices))
    .bind(item.is_available)
    .bind(item.discount)
    .bind(item.discounted_price)
    .bind(item.updated_at)
    .fetch_optional(pool)
    .await
}

pub async fn set_availability(
    pool: &PgPool,
    id: i64,
    available: bool,
    now: i64,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE menu_items SET is_available = $2, updated_at = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(available)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn set_discount(
    pool: &PgPool,
    id: i64,
    discount: Decimal,
    discounted_price: Decimal,
    now: i64,
) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE menu_items SET discount = $2, discounted_price = $3, updated_at = $4
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(discount)
    .bind(discounted_price)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
