use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Echoes the caller's `X-Trace-Id` or mints a fresh one, and stores it in the
/// request extensions.
pub async fn assign_trace_id(mut req: Request<Body>, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(trace_id.clone());
    let span = tracing::debug_span!("request", trace_id = %trace_id);
    let mut res = next.run(req).instrument(span).await;
    res.headers_mut().insert(
        TRACE_ID_HEADER,
        HeaderValue::from_str(&trace_id).unwrap_or(HeaderValue::from_static("invalid")),
    );
    res
}
