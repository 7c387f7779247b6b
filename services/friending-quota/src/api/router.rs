use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::ApiState;

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .route(
            "/api/friending-quota",
            get(handlers::list_quotas).post(handlers::create_quota),
        )
        .route("/api/friending-quota/check", post(handlers::check_quota))
        .route("/api/friending-quota/:email", get(handlers::get_quota))
        .route(
            "/api/friending-quota/:email/remaining",
            get(handlers::get_remaining_quota),
        )
        .route(
            "/api/friending-quota/:email/max-allowed",
            put(handlers::set_max_allowed),
        )
        .route(
            "/api/friending-quota/:email/total-friended",
            put(handlers::override_total_friended),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(middleware)
}
