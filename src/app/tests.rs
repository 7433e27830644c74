//! Router-level tests: the real `Router` driven with `oneshot` over the
//! in-memory store, a recording mailer and fake OAuth providers.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use super::build_app;
use crate::config::Config;
use crate::models::{customer::PosCustomer, integration::Platform};
use crate::providers::Providers;
use crate::services::{
    campaign_service::tests::RecordingMailer, integration_service::tests::FakeOAuth, totp,
};
use crate::state::AppState;
use crate::store::{Store, memory::MemoryStore};

struct TestApp {
    app: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&format!("{}=", name)))
    }
}

impl TestApp {
    fn new() -> Self {
        Self::with_providers(Providers::default())
    }

    fn with_providers(providers: Providers) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(
            Config::for_tests(),
            Arc::new(MemoryStore::new()),
            mailer.clone(),
            providers,
        )
        .unwrap();
        Self {
            app: build_app(state.clone()),
            state,
            mailer,
        }
    }

    fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register and sign in; returns the session token.
    async fn signup(&self, email: &str) -> String {
        let res = self
            .call(request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "secret123" })),
            ))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

        let res = self
            .call(request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "secret123" })),
            ))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["token"].as_str().unwrap().to_string()
    }

    async fn create_shop(&self, token: &str, name: &str) -> TestResponse {
        let res = self
            .call(request(
                Method::POST,
                "/api/shops",
                Some(token),
                Some(json!({ "name": name, "email": "hello@shop.test" })),
            ))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    request
}

fn unix_now() -> u64 {
    Utc::now().timestamp() as u64
}

#[tokio::test]
async fn health_and_auth_gate() {
    let t = TestApp::new();
    let res = t.call(request(Method::GET, "/health", None, None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");

    let res = t.call(request(Method::GET, "/api/user/me", None, None)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "unauthorized");

    let res = t
        .call(request(Method::GET, "/api/user/me", Some("garbage"), None))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let t = TestApp::new();
    t.signup("ada@example.com").await;

    let res = t
        .call(request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ADA@example.com ", "password": "secret123" })),
        ))
        .await;
    let cookie = res.cookie("session").unwrap();
    assert!(cookie.contains("HttpOnly; SameSite=Lax; Path=/"));
    let pair = cookie.split(';').next().unwrap().to_string();

    let res = t
        .call(with_cookie(request(Method::GET, "/api/user/me", None, None), &pair))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "ada@example.com");
    assert!(res.body.get("passwordHash").is_none());
}

#[tokio::test]
async fn login_does_not_reveal_which_part_was_wrong() {
    let t = TestApp::new();
    t.signup("ada@example.com").await;

    for body in [
        json!({ "email": "ada@example.com", "password": "wrong-pass1" }),
        json!({ "email": "nobody@example.com", "password": "secret123" }),
    ] {
        let res = t
            .call(request(Method::POST, "/api/auth/login", None, Some(body)))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn coupon_lifecycle_across_two_users() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    let b = t.signup("b@example.com").await;

    let res = t
        .call(request(
            Method::POST,
            "/api/coupons",
            Some(&a),
            Some(json!({
                "codeName": "SUMMER2025",
                "discount": 15,
                "validUntil": "2025-09-01T00:00:00"
            })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["coupon"]["codeName"], "SUMMER2025");
    let coupon_id = res.body["coupon"]["id"].as_str().unwrap().to_string();

    let res = t.call(request(Method::GET, "/api/coupons", Some(&a), None)).await;
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["coupons"].as_array().unwrap().len(), 1);
    let res = t.call(request(Method::GET, "/api/coupons", Some(&b), None)).await;
    assert_eq!(res.body["coupons"].as_array().unwrap().len(), 0);

    // Codes are unique across users.
    let res = t
        .call(request(
            Method::POST,
            "/api/coupons",
            Some(&b),
            Some(json!({
                "codeName": "SUMMER2025",
                "discount": 20,
                "validUntil": "2025-09-01"
            })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["success"], false);
    assert!(res.body["error"].is_string());

    // B cannot touch A's coupon.
    let uri = format!("/api/coupons/{}", coupon_id);
    let res = t
        .call(request(Method::PATCH, &uri, Some(&b), Some(json!({ "discount": 99 }))))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["success"], false);
    let res = t.call(request(Method::DELETE, &uri, Some(&b), None)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = t.call(request(Method::GET, "/api/coupons", Some(&a), None)).await;
    assert_eq!(res.body["coupons"][0]["discount"], 15.0);

    let res = t.call(request(Method::DELETE, &uri, Some(&a), None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "success": true }));
}

#[tokio::test]
async fn coupon_discount_bounds() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;

    for (code, discount, expected) in [
        ("ZERO", json!(0), StatusCode::BAD_REQUEST),
        ("NEG", json!(-5), StatusCode::BAD_REQUEST),
        ("OVER", json!(100.5), StatusCode::BAD_REQUEST),
        ("FULL", json!(100), StatusCode::CREATED),
        ("TINY", json!(0.5), StatusCode::CREATED),
    ] {
        let res = t
            .call(request(
                Method::POST,
                "/api/coupons",
                Some(&a),
                Some(json!({ "codeName": code, "discount": discount, "validUntil": "2030-01-01" })),
            ))
            .await;
        assert_eq!(res.status, expected, "{}: {}", code, res.body);
    }

    // Malformed bodies still get the envelope.
    let res = t
        .call(request(
            Method::POST,
            "/api/coupons",
            Some(&a),
            Some(json!({ "codeName": "X", "bogus": true })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn active_shop_cannot_point_at_a_foreign_shop() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    let b = t.signup("b@example.com").await;

    let res = t.create_shop(&a, "A's Bakery").await;
    let shop_id = res.body["id"].as_str().unwrap().to_string();
    let cookie = res.cookie("activeShopId").unwrap();
    assert!(cookie.starts_with(&format!("activeShopId={};", shop_id)));
    assert!(cookie.contains("Max-Age=2592000"));

    let res = t
        .call(request(
            Method::POST,
            "/api/shop/active",
            Some(&b),
            Some(json!({ "shopId": shop_id })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(res.set_cookies().is_empty());

    let res = t
        .call(request(
            Method::POST,
            "/api/shop/active",
            Some(&b),
            Some(json!({ "shopId": Uuid::new_v4() })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // A forged cookie reads back as null and does not scope B's requests.
    let forged = format!("activeShopId={}", shop_id);
    let res = t
        .call(with_cookie(request(Method::GET, "/api/shop/active", Some(&b), None), &forged))
        .await;
    assert_eq!(res.body, json!({ "activeShopId": null }));
    let res = t
        .call(with_cookie(request(Method::GET, "/api/campaigns", Some(&b), None), &forged))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "No active shop");

    let res = t
        .call(with_cookie(request(Method::GET, "/api/shop/active", Some(&a), None), &forged))
        .await;
    assert_eq!(res.body["activeShopId"], shop_id.as_str());
}

#[tokio::test]
async fn deleting_the_active_shop_moves_then_clears_the_cookie() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    let first = t.create_shop(&a, "One").await.body["id"].as_str().unwrap().to_string();
    let second = t.create_shop(&a, "Two").await.body["id"].as_str().unwrap().to_string();

    let res = t
        .call(with_cookie(
            request(Method::DELETE, &format!("/api/shops/{}", first), Some(&a), None),
            &format!("activeShopId={}", first),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let cookie = res.cookie("activeShopId").unwrap();
    assert!(cookie.starts_with(&format!("activeShopId={};", second)), "{}", cookie);

    let res = t
        .call(with_cookie(
            request(Method::DELETE, &format!("/api/shops/{}", second), Some(&a), None),
            &format!("activeShopId={}", second),
        ))
        .await;
    let cookie = res.cookie("activeShopId").unwrap();
    assert!(cookie.starts_with("activeShopId=;"), "{}", cookie);
    assert!(cookie.contains("Max-Age=0"));
}

/// Enable two-factor over HTTP and return the issued backup codes.
async fn enroll_two_factor(t: &TestApp, token: &str) -> Vec<String> {
    let res = t
        .call(request(Method::POST, "/api/user/2fa/enable", Some(token), None))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let secret = res.body["secret"].as_str().unwrap().to_string();
    let backup_codes: Vec<String> = res.body["backupCodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();

    let code = totp::code_at(&secret, unix_now()).unwrap();
    let res = t
        .call(request(
            Method::POST,
            "/api/user/2fa/verify",
            Some(token),
            Some(json!({ "code": code, "secret": secret, "backupCodes": backup_codes })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    backup_codes
}

async fn pending_token(t: &TestApp, email: &str) -> String {
    let res = t
        .call(request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "secret123" })),
        ))
        .await;
    assert_eq!(res.body["requiresTwoFactor"], true);
    assert!(res.cookie("session").is_none());
    res.body["pendingToken"].as_str().unwrap().to_string()
}

async fn second_factor(t: &TestApp, email: &str, pending: &str, code: &str, backup: bool) -> TestResponse {
    t.call(request(
        Method::POST,
        "/api/auth/verify-2fa-login",
        None,
        Some(json!({
            "email": email,
            "code": code,
            "isBackupCode": backup,
            "pendingToken": pending
        })),
    ))
    .await
}

#[tokio::test]
async fn sixth_two_factor_attempt_is_rate_limited() {
    let t = TestApp::new();
    let token = t.signup("ada@example.com").await;
    enroll_two_factor(&t, &token).await;
    let pending = pending_token(&t, "ada@example.com").await;

    for _ in 0..5 {
        let res = second_factor(&t, "ada@example.com", &pending, "12345", false).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = second_factor(&t, "ada@example.com", &pending, "12345", false).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn successful_second_factor_resets_the_counter() {
    let t = TestApp::new();
    let token = t.signup("grace@example.com").await;
    let backup_codes = enroll_two_factor(&t, &token).await;
    let pending = pending_token(&t, "grace@example.com").await;

    for _ in 0..4 {
        let res = second_factor(&t, "grace@example.com", &pending, "12345", false).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = second_factor(&t, "grace@example.com", &pending, &backup_codes[0], true).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert!(res.cookie("session").is_some());
    assert!(res.body["token"].is_string());

    // The used backup code is gone.
    let res = second_factor(&t, "grace@example.com", &pending, &backup_codes[0], true).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    for _ in 0..4 {
        let res = second_factor(&t, "grace@example.com", &pending, "12345", false).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = second_factor(&t, "grace@example.com", &pending, "12345", false).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn pending_token_is_not_a_session() {
    let t = TestApp::new();
    let token = t.signup("ada@example.com").await;
    enroll_two_factor(&t, &token).await;
    let pending = pending_token(&t, "ada@example.com").await;

    let res = t
        .call(request(Method::GET, "/api/user/me", Some(&pending), None))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

async fn seed_customers(t: &TestApp, shop_id: Uuid, emails: &[&str]) {
    for (i, email) in emails.iter().enumerate() {
        t.store()
            .upsert_pos_customer(
                shop_id,
                &PosCustomer {
                    external_id: format!("SQ-{}", i),
                    email: Some(email.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
}

async fn schedule_campaign(t: &TestApp, token: &str) -> String {
    let res = t
        .call(request(
            Method::POST,
            "/api/campaigns",
            Some(token),
            Some(json!({
                "name": "Summer",
                "subject": "15% off",
                "body": "<p>Use SUMMER2025</p>",
                "audienceId": "all",
                "status": "Scheduled",
                "scheduledFor": Utc::now() - Duration::minutes(5)
            })),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body["id"].as_str().unwrap().to_string()
}

fn cron(method: Method, secret: Option<&str>) -> Request<Body> {
    request(method, "/api/campaigns/send-schedule", secret, None)
}

#[tokio::test]
async fn scheduler_requires_the_cron_secret() {
    let t = TestApp::new();
    let res = t.call(cron(Method::POST, None)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = t.call(cron(Method::POST, Some("wrong"))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = t.call(cron(Method::GET, Some("cron-secret"))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "success": true, "processed": 0 }));
}

#[tokio::test]
async fn campaign_without_recipients_fails_without_sending() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    t.create_shop(&a, "Corner Bakery").await;
    let campaign_id = schedule_campaign(&t, &a).await;

    let res = t.call(cron(Method::POST, Some("cron-secret"))).await;
    assert_eq!(res.body, json!({ "success": true, "processed": 1 }));
    assert!(t.mailer.sent.lock().await.is_empty());

    let res = t
        .call(request(Method::GET, &format!("/api/campaigns/{}", campaign_id), Some(&a), None))
        .await;
    assert_eq!(res.body["status"], "Failed");
    assert_eq!(res.body["recipients"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn scheduled_campaign_is_sent_once_per_recipient() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    let shop_id: Uuid = t.create_shop(&a, "Corner Bakery").await.body["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    seed_customers(&t, shop_id, &["one@x.test", "two@x.test", "three@x.test"]).await;
    let campaign_id = schedule_campaign(&t, &a).await;

    let (first, second) = tokio::join!(
        t.call(cron(Method::POST, Some("cron-secret"))),
        t.call(cron(Method::POST, Some("cron-secret"))),
    );
    let processed = first.body["processed"].as_u64().unwrap() + second.body["processed"].as_u64().unwrap();
    assert_eq!(processed, 1);

    let sent = t.mailer.sent.lock().await.clone();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.from == "Corner Bakery <campaigns@shopdesk.test>"));
    assert!(sent.iter().all(|m| m.reply_to.as_deref() == Some("hello@shop.test")));

    let res = t
        .call(request(Method::GET, &format!("/api/campaigns/{}", campaign_id), Some(&a), None))
        .await;
    assert_eq!(res.body["status"], "Sent");
    assert!(res.body["sentAt"].is_string());
    assert!(
        res.body["recipients"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["status"] == "Sent")
    );

    let res = t.call(cron(Method::POST, Some("cron-secret"))).await;
    assert_eq!(res.body["processed"], 0);
    assert_eq!(t.mailer.sent.lock().await.len(), 3);
}

#[tokio::test]
async fn illegal_campaign_transition_is_rejected() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    t.create_shop(&a, "Corner Bakery").await;
    let res = t
        .call(request(
            Method::POST,
            "/api/campaigns",
            Some(&a),
            Some(json!({ "name": "Draft", "subject": "Hi", "body": "Hello" })),
        ))
        .await;
    assert_eq!(res.body["status"], "Draft");
    let uri = format!("/api/campaigns/{}", res.body["id"].as_str().unwrap());

    let res = t
        .call(request(Method::PATCH, &uri, Some(&a), Some(json!({ "status": "Sent" }))))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

fn oauth_app(fail_revoke: bool) -> (TestApp, Arc<FakeOAuth>) {
    let square = Arc::new(FakeOAuth {
        fail_revoke,
        ..FakeOAuth::new(Platform::Square)
    });
    let providers = Providers::default()
        .with_oauth(square.clone())
        .with_oauth(Arc::new(FakeOAuth::new(Platform::Gmail)));
    (TestApp::with_providers(providers), square)
}

fn state_from(url: &str) -> String {
    let query = url.split_once('?').unwrap().1;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[tokio::test]
async fn oauth_round_trip_and_disconnect_with_failing_revoke() {
    let (t, square) = oauth_app(true);
    let a = t.signup("a@example.com").await;

    let res = t
        .call(request(Method::POST, "/api/integrations/square/oauth", Some(&a), None))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let state = state_from(res.body["url"].as_str().unwrap());

    let res = t
        .call(request(
            Method::GET,
            &format!("/api/integrations/square/oauth/callback?code=abc&state={}", state),
            None,
            None,
        ))
        .await;
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(
        res.headers[header::LOCATION],
        "http://app.test/dashboard/integrations?square=connected"
    );

    let res = t.call(request(Method::GET, "/api/integrations", Some(&a), None)).await;
    let square_status = &res.body["integrations"][0];
    assert_eq!(square_status["platform"], "Square");
    assert_eq!(square_status["connected"], true);
    assert!(!res.body.to_string().contains("token-abc"));

    let res = t
        .call(request(
            Method::POST,
            "/api/integrations/square/disconnect",
            Some(&a),
            Some(json!({})),
        ))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(square.revokes.load(Ordering::SeqCst), 1);

    let res = t.call(request(Method::GET, "/api/integrations", Some(&a), None)).await;
    assert_eq!(res.body["integrations"][0]["connected"], false);
}

#[tokio::test]
async fn oauth_callback_rejects_tampered_or_foreign_state() {
    let (t, _) = oauth_app(false);
    let a = t.signup("a@example.com").await;

    let res = t
        .call(request(Method::POST, "/api/integrations/email/gmail/oauth", Some(&a), None))
        .await;
    let state = state_from(res.body["url"].as_str().unwrap());

    // Issued for Gmail, replayed against Square.
    let res = t
        .call(request(
            Method::GET,
            &format!("/api/integrations/square/oauth/callback?code=abc&state={}", state),
            None,
            None,
        ))
        .await;
    assert_eq!(
        res.headers[header::LOCATION],
        "http://app.test/dashboard/integrations?square=error&reason=platform_mismatch"
    );

    let (payload, signature) = state.split_once('.').unwrap();
    let flipped = if signature.starts_with('0') { "1" } else { "0" };
    let tampered = format!("{}.{}{}", payload, flipped, &signature[1..]);
    let res = t
        .call(request(
            Method::GET,
            &format!("/api/integrations/email/gmail/callback?code=abc&state={}", tampered),
            None,
            None,
        ))
        .await;
    assert_eq!(
        res.headers[header::LOCATION],
        "http://app.test/dashboard/integrations?gmail=error&reason=invalid_state"
    );
    let res = t
        .call(request(Method::GET, "/api/integrations", Some(&a), None))
        .await;
    assert!(
        res.body["integrations"]
            .as_array()
            .unwrap()
            .iter()
            .all(|i| i["connected"] == false)
    );
}

#[tokio::test]
async fn unconfigured_provider_is_a_bad_request() {
    let t = TestApp::new();
    let a = t.signup("a@example.com").await;
    let res = t
        .call(request(Method::POST, "/api/integrations/email/outlook/oauth", Some(&a), None))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = t
        .call(request(Method::POST, "/api/integrations/email/yahoo/oauth", Some(&a), None))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = t
        .call(request(Method::POST, "/api/integrations/square/disconnect", Some(&a), None))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
