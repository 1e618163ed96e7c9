use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, put},
    Router,
};
use shared::config::Config;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

/// Build and configure the application router.
/// Trailing slashes are trimmed before the request reaches routing.
pub fn build_router(state: AppState, config: &Config) -> NormalizePath<Router> {
    let router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Comment routes
        .route(
            "/products/{product_id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state);

    NormalizePath::trim_trailing_slash(router)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(crate::extract::CUSTOMER_ID_HEADER),
        ]);

    if config.allows_any_origin() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
