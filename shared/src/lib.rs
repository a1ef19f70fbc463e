//! Shared types for the pizza ordering service
//!
//! Domain models, the unified error system, and the live order channel
//! protocol. Used by `pizza-server` and by anything that talks to its API.

pub mod error;
pub mod live;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, ErrorCategory, ErrorCode};
pub use live::{LiveCommand, LiveMessage};
