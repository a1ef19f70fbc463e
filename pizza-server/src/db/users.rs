//! User and user-info database operations

use shared::models::{ProfileUpdate, User, UserInfo};
use sqlx::PgPool;

use crate::auth::UserScope;
use crate::auth::access::RoleChange;

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Insert a credentials account. Returns `None` when the email is taken.
pub async fn create(
    pool: &PgPool,
    id: i64,
    email: &str,
    password_hash: &str,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

const CUSTOMER: &str = "branch_id IS NULL AND NOT super_admin AND NOT is_admin AND NOT is_staff";

pub async fn list(pool: &PgPool, scope: UserScope) -> Result<Vec<User>, sqlx::Error> {
    match scope {
        UserScope::All => {
            sqlx::query_as("SELECT * FROM users ORDER BY created_at")
                .fetch_all(pool)
                .await
        }
        UserScope::BranchMembers(branch_id) => {
            sqlx::query_as(&format!(
                "SELECT * FROM users
                 WHERE (branch_id = $1 AND NOT is_admin AND NOT super_admin) OR ({CUSTOMER})
                 ORDER BY created_at"
            ))
            .bind(branch_id)
            .fetch_all(pool)
            .await
        }
        UserScope::CustomersOnly => {
            sqlx::query_as(&format!(
                "SELECT * FROM users WHERE {CUSTOMER} ORDER BY created_at"
            ))
            .fetch_all(pool)
            .await
        }
    }
}

/// Name/image update; `None` keeps the stored value
pub async fn update_basic(
    pool: &PgPool,
    id: i64,
    update: &ProfileUpdate,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE users SET name = COALESCE($2, name), image = COALESCE($3, image), updated_at = $4
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.image)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn apply_role_change(
    pool: &PgPool,
    id: i64,
    change: RoleChange,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    let (set_branch, branch_id) = match change.branch_id {
        Some(branch_id) => (true, branch_id),
        None => (false, None),
    };
    sqlx::query_as(
        "UPDATE users SET
            is_admin = COALESCE($2, is_admin),
            is_staff = COALESCE($3, is_staff),
            branch_id = CASE WHEN $4 THEN $5 ELSE branch_id END,
            updated_at = $6
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(change.is_admin)
    .bind(change.is_staff)
    .bind(set_branch)
    .bind(branch_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn find_or_create_info(pool: &PgPool, email: &str, now: i64) -> Result<UserInfo, sqlx::Error> {
    sqlx::query("INSERT INTO user_infos (email, updated_at) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(email)
        .bind(now)
        .execute(pool)
        .await?;
    sqlx::query_as(
        "SELECT email, phone, street_address, postal_code, city, province
         FROM user_infos WHERE email = $1",
    )
    .bind(email)
    .fetch_one(pool)
    .await
}

/// Upsert address fields; `None` keeps the stored value
pub async fn upsert_info(
    pool: &PgPool,
    email: &str,
    update: &ProfileUpdate,
    now: i64,
) -> Result<UserInfo, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO user_infos (email, phone, street_address, postal_code, city, province, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (email) DO UPDATE SET
            phone = COALESCE(EXCLUDED.phone, user_infos.phone),
            street_address = COALESCE(EXCLUDED.street_address, user_infos.street_address),
            postal_code = COALESCE(EXCLUDED.postal_code, user_infos.postal_code),
            city = COALESCE(EXCLUDED.city, user_infos.city),
            province = COALESCE(EXCLUDED.province, user_infos.province),
            updated_at = EXCLUDED.updated_at
        RETURNING email, phone, street_address, postal_code, city, province
        "#,
    )
    .bind(email)
    .bind(&update.phone)
    .bind(&update.street_address)
    .bind(&update.postal_code)
    .bind(&update.city)
    .bind(&update.province)
    .bind(now)
    .fetch_one(pool)
    .await
}
