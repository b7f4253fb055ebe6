//! Mapping of subsystem errors onto HTTP responses.

use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::cache::CacheError;
use crate::rtv::ResolveError;
use crate::storage::FetchError;
use crate::store::StoreError;

/// Errors a request handler can end in.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::Fetch(e) => {
                StatusCode::from_u16(e.status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            EdgeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            EdgeError::Resolve(_)
            | EdgeError::Store(_)
            | EdgeError::Cache(_)
            | EdgeError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            EdgeError::Fetch(e) => {
                tracing::info!(status = e.status, "{e}");
                e.to_string()
            }
            EdgeError::MethodNotAllowed(method) => {
                tracing::debug!(method = %method, "Method not allowed");
                FetchError::new(status.as_u16(), "Method Not Allowed").to_string()
            }
            internal => {
                tracing::error!(error = %internal, "Request failed");
                FetchError::new(500, "Internal Server Error").to_string()
            }
        };

        let mut response = (status, message).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=UTF-8"),
        );
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}
