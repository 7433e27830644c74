//! Router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware, state::AppState};

/// Build the full application router.
///
/// Three route groups share one state:
///
/// - public: health, sign-in, OAuth callbacks (the provider redirects the browser)
/// - scheduler: guarded by `CRON_SECRET`
/// - authenticated: everything else, behind the session middleware
pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/auth/verify-2fa-login",
            post(handlers::auth::verify_two_factor_login),
        )
        .route(
            "/api/integrations/square/oauth/callback",
            get(handlers::integrations::square_callback),
        )
        .route(
            "/api/integrations/email/{platform}/callback",
            get(handlers::integrations::email_callback),
        );

    let scheduler_routes = Router::new()
        .route(
            "/api/campaigns/send-schedule",
            get(handlers::campaigns::dispatch_scheduled).post(handlers::campaigns::dispatch_scheduled),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::cron_middleware,
        ));

    let authenticated_routes = Router::new()
        // Account
        .route("/api/user", delete(handlers::user::delete_account))
        .route("/api/user/me", get(handlers::user::me))
        .route("/api/user/profile", patch(handlers::user::update_profile))
        .route("/api/user/password", post(handlers::user::change_password))
        .route("/api/user/2fa/enable", post(handlers::user::enable_two_factor))
        .route("/api/user/2fa/verify", post(handlers::user::verify_two_factor))
        .route("/api/user/2fa/disable", post(handlers::user::disable_two_factor))
        // Shops
        .route(
            "/api/shop/active",
            get(handlers::shops::get_active_shop).post(handlers::shops::set_active_shop),
        )
        .route(
            "/api/shops",
            get(handlers::shops::list_shops).post(handlers::shops::create_shop),
        )
        .route(
            "/api/shops/{id}",
            get(handlers::shops::get_shop)
                .patch(handlers::shops::update_shop)
                .delete(handlers::shops::delete_shop),
        )
        // Coupons
        .route(
            "/api/coupons",
            get(handlers::coupons::list_coupons).post(handlers::coupons::create_coupon),
        )
        .route(
            "/api/coupons/{id}",
            patch(handlers::coupons::update_coupon).delete(handlers::coupons::delete_coupon),
        )
        // Campaigns
        .route(
            "/api/campaigns",
            get(handlers::campaigns::list_campaigns).post(handlers::campaigns::create_campaign),
        )
        .route(
            "/api/campaigns/{id}",
            get(handlers::campaigns::get_campaign)
                .patch(handlers::campaigns::update_campaign)
                .delete(handlers::campaigns::delete_campaign),
        )
        .route(
            "/api/campaigns/{id}/send",
            post(handlers::campaigns::send_campaign),
        )
        // Automations
        .route(
            "/api/automations",
            get(handlers::automations::list_automations)
                .post(handlers::automations::create_automation),
        )
        .route(
            "/api/automations/{id}",
            get(handlers::automations::get_automation)
                .patch(handlers::automations::update_automation)
                .delete(handlers::automations::delete_automation),
        )
        // Customers
        .route("/api/customers", get(handlers::customers::list_customers))
        .route(
            "/api/customers/import",
            post(handlers::customers::import_customers),
        )
        // Integrations
        .route(
            "/api/integrations",
            get(handlers::integrations::list_integrations),
        )
        .route(
            "/api/integrations/square/oauth",
            get(handlers::integrations::square_authorize_redirect)
                .post(handlers::integrations::square_authorize_url),
        )
        .route(
            "/api/integrations/square/disconnect",
            post(handlers::integrations::square_disconnect),
        )
        .route(
            "/api/integrations/email/{platform}/oauth",
            get(handlers::integrations::email_authorize_redirect)
                .post(handlers::integrations::email_authorize_url),
        )
        .route(
            "/api/integrations/email/{platform}/disconnect",
            post(handlers::integrations::email_disconnect),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(scheduler_routes)
        .merge(authenticated_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri.path(), status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

#[cfg(test)]
mod tests;
