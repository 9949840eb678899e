use axum::http::{Method, Uri};

use super::AppError;

/// Router fallback: unknown routes answer with an enveloped 404.
pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {method} {}", uri.path()))
}
