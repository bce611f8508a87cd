use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::handlers;

/// Every path and method goes through the same handler.
pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::serve_path)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
