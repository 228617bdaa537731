use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::app::AppState;

/// `GET /`: every configuration entry, in store order, as `{"key", "value"}` objects.
pub async fn list_values(State(state): State<AppState>) -> Response {
    tracing::debug!(entries = state.store.len(), "enumerating configuration");
    Json(&*state.store).into_response()
}
