// handlers/public/not_found.rs - Fallback for requests no route matches

use axum::{extract::OriginalUri, http::Method};

use crate::error::DomainError;
use crate::middleware::ApiError;

/// Unknown paths answer with the usual failure envelope.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    tracing::warn!(%method, path = %uri.path(), "no route matched");
    ApiError(DomainError::RouteNotFound(uri.path().to_string()))
}
