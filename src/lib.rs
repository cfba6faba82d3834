pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod records;
pub mod router;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod testing;

use axum::{routing::any, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// One physical route fronting the whole logical API; the dispatch table in
/// [`router`] does the rest.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/:op", any(router::dispatch))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
