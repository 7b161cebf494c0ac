//! HTTP router and middleware stack

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers::{self, health, ready};
use crate::state::AppState;

/// Build the full router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 routes
    let api_v1 = Router::new()
        // Usage routes
        .route("/usage/check", post(handlers::check_usage))
        .route("/usage/enforce", post(handlers::enforce_usage))
        .route("/usage/increment", post(handlers::increment_usage))
        .route("/usage/{user_id}", get(handlers::get_usage))
        // Subscription routes
        .route("/subscription/{user_id}", get(handlers::get_subscription))
        .route("/tier-limits", get(handlers::get_tier_limits));

    // Webhook routes (raw body, verified before parsing)
    let webhook_routes = Router::new()
        .route("/webhooks/stripe", post(handlers::stripe_webhook))
        .route("/webhooks/stripe-connect", post(handlers::stripe_connect_webhook))
        .route("/webhooks/revenuecat", post(handlers::revenuecat_webhook));

    // Scheduler-triggered routes (no timeout - a batch runs to completion)
    let internal_routes = Router::new()
        .route(
            "/recurring-invoices/run",
            post(handlers::run_recurring_invoices),
        )
        .route(
            "/webhook-events/cleanup",
            post(handlers::cleanup_webhook_events),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                ),
        );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .layer(middleware)
        .nest("/internal", internal_routes)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
