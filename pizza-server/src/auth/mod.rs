//! Sessions, access policy and request throttling

pub mod access;
pub mod rate_limit;
pub mod session;

pub use access::{Actor, MenuScope, OrderScope, Role, UserScope, menu_scope};
pub use rate_limit::RateLimiter;
pub use session::CurrentUser;
