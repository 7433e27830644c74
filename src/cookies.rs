//! Cookie helpers for the `session` and `activeShopId` cookies.
//!
//! Both are `HttpOnly; SameSite=Lax; Path=/`, plus `Secure` when
//! `COOKIE_SECURE` is set.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
pub const ACTIVE_SHOP_COOKIE: &str = "activeShopId";

/// 30 days.
pub const ACTIVE_SHOP_MAX_AGE: i64 = 60 * 60 * 24 * 30;

/// Value of cookie `name`, searching every `Cookie` header.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value storing `value` for `max_age` seconds.
pub fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes `name`.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", 0, secure)
}

/// The raw `activeShopId` cookie, if present and a well-formed id.
///
/// Ownership is NOT checked here; see `shop_service::resolve_active_shop`.
#[derive(Debug, Clone, Copy)]
pub struct ActiveShopCookie(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for ActiveShopCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            read_cookie(&parts.headers, ACTIVE_SHOP_COOKIE).and_then(|v| Uuid::parse_str(&v).ok()),
        ))
    }
}
