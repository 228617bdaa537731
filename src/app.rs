use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{api, middleware::assign_trace_id, store::ConfigurationStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigurationStore>,
}

pub fn build_router(store: Arc<ConfigurationStore>) -> Router {
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let middleware = ServiceBuilder::new()
        .layer(middleware::from_fn(assign_trace_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new()
        .route("/", get(api::values::list_values))
        .route("/healthz", get(api::health::health_check))
        .fallback(api::not_found)
        .layer(middleware)
        .with_state(state)
}
