//! Request inspection and request IDs.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Extract everything handlers need from the request head: path, opt-in
//!   cookie and query parameter, brotli support, visitor geography, origin

use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::GeoConfig;
use crate::rtv::RequestSignals;
use crate::storage::paths::is_lts_path;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Cookie carrying a channel opt-in.
pub const OPT_IN_COOKIE: &str = "__Host-AMP_OPT_IN";

/// Query parameter carrying a channel opt-in.
pub const OPT_IN_QUERY: &str = "optin";

/// Generates `x-request-id` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Per-request inputs of the edge handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub cookie_opt_in: Option<String>,
    pub query_opt_in: Option<String>,
    pub accepts_brotli: bool,
    pub country: Option<String>,
    pub region: Option<String>,
    /// `scheme://host` the request was addressed to.
    pub origin: String,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts, geo: &GeoConfig, public_origin: Option<&str>) -> Self {
        let headers = &parts.headers;
        Self {
            path: parts.uri.path().to_string(),
            cookie_opt_in: cookie_value(headers, OPT_IN_COOKIE),
            query_opt_in: parts.uri.query().and_then(|q| query_value(q, OPT_IN_QUERY)),
            accepts_brotli: accepts_brotli(headers),
            country: header_value(headers, &geo.country_header),
            region: header_value(headers, &geo.region_header),
            origin: public_origin
                .map(|o| o.trim_end_matches('/').to_string())
                .unwrap_or_else(|| request_origin(headers)),
        }
    }

    /// Inputs of RTV resolution.
    pub fn signals(&self) -> RequestSignals {
        RequestSignals {
            cookie_opt_in: self.cookie_opt_in.clone(),
            query_opt_in: self.query_opt_in.clone(),
            is_lts: is_lts_path(&self.path),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

fn query_value(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Whether `Accept-Encoding` lists `br` with a non-zero quality.
fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| {
            let mut parts = token.split(';').map(str::trim);
            let coding = parts.next().unwrap_or_default();
            let rejected = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            coding.eq_ignore_ascii_case("br") && !rejected
        })
}

fn request_origin(headers: &HeaderMap) -> String {
    let scheme = header_value(headers, "x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header_value(headers, header::HOST.as_str())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{scheme}://{host}")
}
