//! Branch database operations

use shared::models::{Branch, BranchCreate, BranchUpdate};
use sqlx::PgPool;

pub async fn list_active(pool: &PgPool) -> Result<Vec<Branch>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM branches WHERE is_active ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM branches WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    id: i64,
    data: &BranchCreate,
    now: i64,
) -> Result<Branch, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO branches (id, name, image, location, phone, about, email, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $8)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.image)
    .bind(&data.location)
    .bind(&data.phone)
    .bind(&data.about)
    .bind(&data.email)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Partial update; `None` fields keep their value
pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &BranchUpdate,
    now: i64,
) -> Result<Option<Branch>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE branches SET
            name = COALESCE($2, name),
            image = COALESCE($3, image),
            location = COALESCE($4, location),
            phone = COALESCE($5, phone),
            about = COALESCE($6, about),
            email = COALESCE($7, email),
            is_active = COALESCE($8, is_active),
            updated_at = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.image)
    .bind(&data.location)
    .bind(&data.phone)
    .bind(&data.about)
    .bind(&data.email)
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await
}
