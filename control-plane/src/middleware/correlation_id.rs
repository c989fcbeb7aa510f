//! Request correlation ID middleware as an axum `tower::Layer`: reuse the
//! caller's `x-correlation-id` header if present, otherwise generate a
//! UUID v4, and echo it back on the response so logs on both sides of a
//! call can be joined.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

const HEADER_NAME: &str = "x-correlation-id";

pub async fn correlation_id_layer(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!("request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(HEADER_NAME, value);
    }

    response
}
