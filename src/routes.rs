// routes.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{affiliate, tracking, webhook},
    middleware::caller_identity,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Affiliate program routes (require a resolved caller identity)
    let affiliate_routes = Router::new()
        .route("/", post(affiliate::apply_affiliate))
        .route("/:affiliate_id/status", patch(affiliate::update_affiliate_status))
        .route(
            "/links",
            get(affiliate::list_links).post(affiliate::create_link),
        )
        .route("/dashboard", get(affiliate::get_dashboard))
        .layer(middleware::from_fn(caller_identity));

    // Public tracking routes (fired from visitor browsers)
    let tracking_routes = Router::new()
        .route("/clicks", post(tracking::record_click))
        .route("/conversions", post(tracking::record_conversion));

    // Signed provider callbacks
    let webhook_routes = Router::new().route("/payment", post(webhook::payment_webhook));

    let api_route = Router::new()
        .nest("/affiliates", affiliate_routes)
        .nest("/tracking", tracking_routes)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
