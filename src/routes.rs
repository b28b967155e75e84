// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        offers::offers_handler,
        orders::orders_handler,
        payouts::{payouts_handler, plans_handler},
        webhook::webhook_handler,
    },
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest(
            "/offers",
            offers_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/orders",
            orders_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/payouts",
            payouts_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/plans",
            plans_handler().layer(middleware::from_fn(auth)),
        )
        // Public: the gateway signs its own requests.
        .nest("/webhook", webhook_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
