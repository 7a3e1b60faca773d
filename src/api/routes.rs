use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Generation
        .route("/generate", post(handlers::generate_mindmap::<S>))
        .route("/test-webhook", post(handlers::test_webhook::<S>))
        // Mind maps
        .route(
            "/mindmap/:mindmap_id",
            get(handlers::get_mindmap::<S>).delete(handlers::delete_mindmap::<S>),
        )
        .route("/recent", get(handlers::list_recent_mindmaps::<S>))
        // Sessions
        .route(
            "/session/:session_id/mindmaps",
            get(handlers::list_session_mindmaps::<S>),
        )
        .route(
            "/session/:session_id/stats",
            get(handlers::get_session_stats::<S>),
        )
        // Analytics
        .route("/analytics", get(handlers::get_analytics::<S>))
}

/// CORS policy for the configured origins; `"*"` allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        log::warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                }),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
