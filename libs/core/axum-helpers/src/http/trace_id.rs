//! Per-request trace ids.
//!
//! The id is taken from `x-trace-id` or `x-request-id` when the caller sends a
//! usable one, otherwise generated. It is stored in a task-local for the
//! duration of the request, recorded on a `request` span, and echoed back in the
//! `x-trace-id` response header.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_TRACE_ID_LEN: usize = 128;

tokio::task_local! {
    static TRACE_ID: String;
}

/// Trace id of the request being served, or a fresh one outside a request.
pub fn current_trace_id() -> String {
    TRACE_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| new_trace_id())
}

/// Run `future` with `trace_id` as the current trace id.
pub async fn with_trace_id<F: Future>(trace_id: String, future: F) -> F::Output {
    TRACE_ID.scope(trace_id, future).await
}

fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn incoming_trace_id(headers: &HeaderMap) -> Option<String> {
    [&TRACE_ID_HEADER, &REQUEST_ID_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|id| {
            !id.is_empty()
                && id.len() <= MAX_TRACE_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(str::to_string)
}

pub async fn trace_id_middleware(request: Request, next: Next) -> Response {
    let trace_id = incoming_trace_id(request.headers()).unwrap_or_else(new_trace_id);
    let span = tracing::info_span!("request", trace_id = %trace_id);

    let mut response = with_trace_id(trace_id.clone(), next.run(request).instrument(span)).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
