//! Request correlation ID middleware.
//!
//! Extracts or generates an `x-request-id` for each request and propagates
//! it to the response, so dashboard-reported failures can be matched to
//! server logs.

use axum::http::{header::HeaderValue, HeaderName, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// The header name for request correlation IDs.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A UUID v4 generator for request IDs.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Creates the request ID layer stack.
///
/// Returns the set and propagate layers; apply propagate after set (layers
/// run in reverse application order).
#[must_use]
pub fn create_request_id_layers(
) -> (SetRequestIdLayer<UuidRequestIdGenerator>, PropagateRequestIdLayer) {
    let set_layer = SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestIdGenerator);
    let propagate_layer = PropagateRequestIdLayer::new(X_REQUEST_ID.clone());
    (set_layer, propagate_layer)
}
