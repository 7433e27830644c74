//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, cookies, the caller)
//! 2. Delegates to a service in `crate::services`
//! 3. Returns HTTP response (JSON, status code, cookies)

/// Registration, sign-in and sign-out
pub mod auth;
pub mod automations;
pub mod campaigns;
/// Coupon endpoints (`{success, ...}` envelope)
pub mod coupons;
pub mod customers;
pub mod health;
/// OAuth connections
pub mod integrations;
/// Shops and the active-shop cookie
pub mod shops;
/// The signed-in user's own account
pub mod user;
