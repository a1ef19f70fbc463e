//! Branch Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A store location. Most other records are partitioned by branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub location: String,
    pub phone: String,
    pub about: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create branch payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BranchCreate {
    #[validate(length(min = 1, max = 100, message = "Branch name is required"))]
    pub name: String,
    pub image: Option<String>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub about: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

/// Update branch payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub about: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}
