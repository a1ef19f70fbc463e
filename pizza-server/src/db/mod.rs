//! Database access layer (PostgreSQL)

pub mod branches;
pub mod categories;
pub mod menu_items;
pub mod orders;
pub mod users;
pub mod webhook_events;
