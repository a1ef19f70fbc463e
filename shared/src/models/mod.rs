//! Data models
//!
//! Shared between pizza-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGINT), timestamps are Unix millis.

pub mod branch;
pub mod category;
pub mod menu_item;
pub mod order;
pub mod user;

// Re-exports
pub use branch::*;
pub use category::*;
pub use menu_item::*;
pub use order::*;
pub use user::*;
