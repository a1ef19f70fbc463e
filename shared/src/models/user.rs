//! User Model

use serde::{Deserialize, Serialize};

/// Account record. `password_hash` never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub super_admin: bool,
    pub is_admin: bool,
    pub is_staff: bool,
    pub branch_id: Option<i64>,
    /// Account created through an external sign-in provider
    pub google_auth: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Contact and address details, keyed by email
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserInfo {
    pub email: String,
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

/// User merged with its info record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

impl UserProfile {
    pub fn merge(user: User, info: UserInfo) -> Self {
        Self {
            user,
            phone: info.phone,
            street_address: info.street_address,
            postal_code: info.postal_code,
            city: info.city,
            province: info.province,
        }
    }
}

/// PUT /api/profile
///
/// Without `id` the caller edits themselves; role fields are only honoured
/// when editing someone else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub is_admin: Option<bool>,
    pub is_staff: Option<bool>,
    pub branch_id: Option<i64>,
}
