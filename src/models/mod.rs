//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response bodies that travel with them.

pub mod automation;
pub mod campaign;
pub mod coupon;
/// CRM customers imported from the POS provider
pub mod customer;
/// OAuth connection records
pub mod integration;
/// Tenants
pub mod shop;
/// Accounts, credentials and profile
pub mod user;
