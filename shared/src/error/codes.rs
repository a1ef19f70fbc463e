//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Branch errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account signs in through an external provider
    ExternalSignInAccount = 1008,
    /// Too many attempts from the same client
    TooManyAttempts = 1009,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Branch admin or super admin required
    AdminRequired = 2003,
    /// Super admin required
    SuperAdminRequired = 2006,

    // ==================== 3xxx: Branch ====================
    /// Branch not found
    BranchNotFound = 3001,
    /// Branch is not active
    BranchInactive = 3002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been completed
    OrderAlreadyCompleted = 4003,
    /// Order is empty
    OrderEmpty = 4007,
    /// Status cannot move backwards or stay the same
    InvalidStatusTransition = 4010,
    /// Order status was changed by someone else
    OrderStatusConflict = 4011,

    // ==================== 5xxx: Payment ====================
    /// Payment provider could not create a checkout session
    CheckoutSessionFailed = 5006,
    /// Webhook signature is invalid
    WebhookSignatureInvalid = 5007,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item has invalid price
    MenuItemInvalidPrice = 6002,
    /// Menu item is not available
    MenuItemUnavailable = 6003,
    /// Discount outside 0..=100
    InvalidDiscount = 6004,
    /// Size option not found on menu item
    SizeNotFound = 6005,
    /// Extra ingredient not found on menu item
    ExtraNotFound = 6006,
    /// Category not found
    CategoryNotFound = 6101,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Email already registered
    EmailAlreadyExists = 8002,
    /// Password too short
    PasswordTooShort = 8003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::ExternalSignInAccount => "This account signs in with Google",
            ErrorCode::TooManyAttempts => "Too many requests, try again later",

            // Permission
            ErrorCode::PermissionDenied => "Not authorized",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::SuperAdminRequired => "Super administrator role is required",

            // Branch
            ErrorCode::BranchNotFound => "Branch not found",
            ErrorCode::BranchInactive => "Branch is not active",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyCompleted => "Order has already been completed",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::InvalidStatusTransition => "Order status can only move forward",
            ErrorCode::OrderStatusConflict => "Order status was changed concurrently",

            // Payment
            ErrorCode::CheckoutSessionFailed => "Failed to create checkout session",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemInvalidPrice => "Menu item has invalid price",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",
            ErrorCode::InvalidDiscount => "Discount must be between 0 and 100",
            ErrorCode::SizeNotFound => "Size option not found",
            ErrorCode::ExtraNotFound => "Extra ingredient not found",
            ErrorCode::CategoryNotFound => "Category not found",

            // User
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::EmailAlreadyExists => "Email already exists",
            ErrorCode::PasswordTooShort => "Password must be at least 5 characters",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1008 => Ok(ErrorCode::ExternalSignInAccount),
            1009 => Ok(ErrorCode::TooManyAttempts),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::SuperAdminRequired),

            // Branch
            3001 => Ok(ErrorCode::BranchNotFound),
            3002 => Ok(ErrorCode::BranchInactive),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4003 => Ok(ErrorCode::OrderAlreadyCompleted),
            4007 => Ok(ErrorCode::OrderEmpty),
            4010 => Ok(ErrorCode::InvalidStatusTransition),
            4011 => Ok(ErrorCode::OrderStatusConflict),

            // Payment
            5006 => Ok(ErrorCode::CheckoutSessionFailed),
            5007 => Ok(ErrorCode::WebhookSignatureInvalid),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemInvalidPrice),
            6003 => Ok(ErrorCode::MenuItemUnavailable),
            6004 => Ok(ErrorCode::InvalidDiscount),
            6005 => Ok(ErrorCode::SizeNotFound),
            6006 => Ok(ErrorCode::ExtraNotFound),
            6101 => Ok(ErrorCode::CategoryNotFound),

            // User
            8001 => Ok(ErrorCode::UserNotFound),
            8002 => Ok(ErrorCode::EmailAlreadyExists),
            8003 => Ok(ErrorCode::PasswordTooShort),

            // System
            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::BranchNotFound.code(), 3001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidStatusTransition.code(), 4010);
        assert_eq!(ErrorCode::CheckoutSessionFailed.code(), 5006);
        assert_eq!(ErrorCode::MenuItemNotFound.code(), 6001);
        assert_eq!(ErrorCode::CategoryNotFound.code(), 6101);
        assert_eq!(ErrorCode::EmailAlreadyExists.code(), 8002);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_round_trips_every_variant() {
        let all = [
            ErrorCode::ValidationFailed,
            ErrorCode::RequiredField,
            ErrorCode::ValueOutOfRange,
            ErrorCode::NotAuthenticated,
            ErrorCode::InvalidCredentials,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::ExternalSignInAccount,
            ErrorCode::TooManyAttempts,
            ErrorCode::PermissionDenied,
            ErrorCode::AdminRequired,
            ErrorCode::SuperAdminRequired,
            ErrorCode::BranchNotFound,
            ErrorCode::BranchInactive,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderAlreadyCompleted,
            ErrorCode::OrderEmpty,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::OrderStatusConflict,
            ErrorCode::CheckoutSessionFailed,
            ErrorCode::WebhookSignatureInvalid,
            ErrorCode::MenuItemNotFound,
            ErrorCode::MenuItemInvalidPrice,
            ErrorCode::MenuItemUnavailable,
            ErrorCode::InvalidDiscount,
            ErrorCode::SizeNotFound,
            ErrorCode::ExtraNotFound,
            ErrorCode::CategoryNotFound,
            ErrorCode::UserNotFound,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::PasswordTooShort,
            ErrorCode::InternalError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(9999), Err(InvalidErrorCode(9999)));
        assert_eq!(ErrorCode::try_from(100), Err(InvalidErrorCode(100)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");

        let code: ErrorCode = serde_json::from_str("6004").unwrap();
        assert_eq!(code, ErrorCode::InvalidDiscount);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }
}
