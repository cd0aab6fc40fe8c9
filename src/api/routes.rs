use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{
    make_span_with_request_id, request_id_middleware, REQUEST_ID_HEADER,
};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/crops", crop_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Outermost, so the request ID exists before the trace span is created
        .layer(middleware::from_fn(request_id_middleware))
}

/// Crop routes under /api/crops
fn crop_routes() -> Router<AppState> {
    Router::new()
        .route("/recommend", post(handlers::recommend_crops))
        .route("/catalog", get(handlers::list_crops))
        .route("/catalog/:name", get(handlers::crop_details))
        .route(
            "/recommendations/:user_id",
            get(handlers::recommendation_history),
        )
}

/// CORS policy for the configured frontend origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
