//! Request-scoped middleware.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Request id propagated through extensions and echoed back to callers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Attaches a request id to every request.
///
/// - Reuses an inbound `x-request-id` header when present, otherwise
///   generates a UUID
/// - Inserted into request extensions as [`RequestId`]
/// - Echoed on the response as `x-request-id`
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}
