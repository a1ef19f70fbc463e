//! Category database operations

use shared::models::Category;
use sqlx::PgPool;

use crate::auth::MenuScope;

pub async fn list(pool: &PgPool, scope: MenuScope) -> Result<Vec<Category>, sqlx::Error> {
    match scope {
        MenuScope::All => {
            sqlx::query_as("SELECT * FROM categories ORDER BY name")
                .fetch_all(pool)
                .await
        }
        MenuScope::Branch(branch_id) => {
            sqlx::query_as("SELECT * FROM categories WHERE branch_id = $1 ORDER BY name")
                .bind(branch_id)
                .fetch_all(pool)
                .await
        }
        MenuScope::Nothing => Ok(Vec::new()),
    }
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    id: i64,
    name: &str,
    branch_id: i64,
    now: i64,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO categories (id, name, branch_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4) RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(branch_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn rename(
    pool: &PgPool,
    id: i64,
    name: &str,
    now: i64,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("UPDATE categories SET name = $2, updated_at = $3 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(name)
        .bind(now)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
