//! HTTP middleware components.
//!
//! Middleware run before route handlers and can short-circuit a request
//! (reject unauthenticated callers) or decorate it (inject the caller).

/// Active-shop extractor for tenant-scoped routes
pub mod active_shop;
/// Session and cron-secret authentication
pub mod auth;
