//! Response construction: cache policy, content type and shared headers.
//!
//! # Responsibilities
//! - Hold the one table of Cache-Control values per route class
//! - Normalize Content-Type values coming out of storage
//! - Attach the shared security headers to every file response
//! - Keep pre-encoded bodies away from the response-compression layer
//!
//! # Design Decisions
//! - Upstream headers are dropped; only Content-Type and Content-Encoding
//!   survive from the stored object
//! - Extra headers are applied last and override anything set before them

use axum::body::{Body, HttpBody};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::compression::Predicate;

use crate::security::headers::SHARED_HEADERS;
use crate::storage::ServedFile;

/// Cache-Control class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Unversioned files.
    Default,
    /// Entry files and the experiments page.
    EntryFile,
    /// Geography-injected files.
    AmpGeo,
    /// Unversioned LTS files.
    Lts,
    /// Files addressed by an explicit RTV, and stored cache copies.
    StaticRtvFile,
    /// The `/rtv/metadata` document.
    RtvMetadata,
    /// Service worker scripts.
    ServiceWorker,
}

impl CachePolicy {
    pub fn header_value(&self) -> &'static str {
        match self {
            CachePolicy::Default => "private, max-age=604800, stale-while-revalidate=604800",
            CachePolicy::EntryFile => "private, max-age=3000, stale-while-revalidate=1206600",
            CachePolicy::AmpGeo => "private, max-age=1800",
            CachePolicy::Lts => "private, max-age=2419200, stale-while-revalidate=604800",
            CachePolicy::StaticRtvFile => "public, max-age=31536000",
            CachePolicy::RtvMetadata => "public, max-age=0",
            CachePolicy::ServiceWorker => "no-cache, must-revalidate",
        }
    }
}

/// Content type of JSON documents generated by the edge.
pub const APPLICATION_JSON: &str = "application/json; charset=UTF-8";

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

const TEXTUAL_TYPES: [&str; 5] = [
    "text/javascript",
    "text/plain",
    "text/html",
    "text/css",
    "application/json",
];

/// Normalize a stored content type for serving.
pub fn normalize_content_type(content_type: Option<&str>) -> String {
    let Some(content_type) = content_type.map(str::trim).filter(|c| !c.is_empty()) else {
        return DEFAULT_CONTENT_TYPE.to_string();
    };

    let (essence, params) = match content_type.split_once(';') {
        Some((essence, params)) => (essence.trim(), Some(params)),
        None => (content_type, None),
    };
    let essence = essence.to_ascii_lowercase();
    let essence = if essence == "application/javascript" {
        "text/javascript".to_string()
    } else {
        essence
    };

    if !TEXTUAL_TYPES.contains(&essence.as_str()) {
        return content_type.to_string();
    }

    match params {
        Some(params) if params.to_ascii_lowercase().contains("charset") => {
            format!("{essence};{params}")
        }
        Some(params) => format!("{essence};{params}; charset=UTF-8"),
        None => format!("{essence}; charset=UTF-8"),
    }
}

/// Response extension marking a body that is already content-encoded.
#[derive(Debug, Clone, Copy)]
pub struct PreEncoded;

/// Compression predicate that leaves pre-encoded responses alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotPreEncoded;

impl Predicate for NotPreEncoded {
    fn should_compress<B>(&self, response: &http::Response<B>) -> bool
    where
        B: HttpBody,
    {
        response.extensions().get::<PreEncoded>().is_none()
            && !response.headers().contains_key(header::CONTENT_ENCODING)
    }
}

/// Build the client response for a file under `policy`.
pub fn with_headers(
    file: ServedFile,
    policy: CachePolicy,
    extra: &[(HeaderName, &str)],
) -> Response {
    let content_type = normalize_content_type(file.content_type.as_deref());
    let body = file.body.map(Body::from).unwrap_or_else(Body::empty);
    let mut response = (StatusCode::OK, body).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(policy.header_value()));
    insert(headers, header::CONTENT_TYPE, &content_type);
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    if let Some(encoding) = file.content_encoding {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
    }
    for (name, value) in SHARED_HEADERS.iter() {
        insert(headers, name.clone(), value);
    }
    for (name, value) in extra {
        insert(headers, name.clone(), value);
    }

    if file.content_encoding.is_some() {
        response.extensions_mut().insert(PreEncoded);
    }
    response
}

fn insert(headers: &mut http::HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "Dropping invalid header value"),
    }
}
