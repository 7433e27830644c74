//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They work against the [`Store`](crate::store::Store) traits and the
//! provider traits, never against SQL or HTTP clients directly.

pub mod account_service;
pub mod automation_service;
pub mod campaign_service;
pub mod coupon_service;
pub mod customer_service;
pub mod integration_service;
pub mod shop_service;
pub mod two_factor_service;

/// Primitives shared by the services above
pub mod crypto;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod totp;
