//! HTTP middleware.
//!
//! - [`trace_id`]: request-scoped trace ids used by the response envelope
//! - [`security`]: hardening response headers

pub mod security;
pub mod trace_id;

pub use security::security_headers;
pub use trace_id::{TRACE_ID_HEADER, current_trace_id, trace_id_middleware, with_trace_id};
