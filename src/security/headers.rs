//! Security headers attached to every served file.

use axum::http::header::{self, HeaderName};

/// Content-Security-Policy of the runtime files.
pub const CONTENT_SECURITY_POLICY: &str = "default-src * blob: data:; \
script-src blob: https://cdn.ampproject.org/lts/ https://cdn.ampproject.org/rtv/ \
https://cdn.ampproject.org/sw/ https://cdn.ampproject.org/v0.js https://cdn.ampproject.org/v0.mjs \
https://cdn.ampproject.org/v0/ https://cdn.ampproject.org/viewer/; \
object-src 'none'; \
style-src 'unsafe-inline' https://cdn.ampproject.org/rtv/ https://cdn.materialdesignicons.com \
https://cloud.typography.com https://fast.fonts.net https://fonts.googleapis.com \
https://maxcdn.bootstrapcdn.com https://p.typekit.net https://pro.fontawesome.com \
https://use.fontawesome.com https://use.typekit.net; \
report-uri https://csp.withgoogle.com/csp/amp";

/// Headers set on every file response, after the cache policy.
pub static SHARED_HEADERS: [(HeaderName, &str); 7] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
    (HeaderName::from_static("cross-origin-resource-policy"), "cross-origin"),
    (header::STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains; preload"),
    (HeaderName::from_static("timing-allow-origin"), "*"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_XSS_PROTECTION, "0"),
];

/// Extra headers of the experiments page, which must never be framed.
pub static EXPERIMENTS_PAGE_HEADERS: [(HeaderName, &str); 2] = [
    (header::X_FRAME_OPTIONS, "deny"),
    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
];

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_values_are_valid() {
        for (name, value) in SHARED_HEADERS.iter().chain(EXPERIMENTS_PAGE_HEADERS.iter()) {
            assert!(HeaderValue::from_str(value).is_ok(), "invalid value for {name}");
        }
    }

    #[test]
    fn test_csp_is_single_spaced() {
        assert!(!CONTENT_SECURITY_POLICY.contains("  "));
        assert!(CONTENT_SECURITY_POLICY.starts_with("default-src * blob: data:; script-src blob: "));
        assert!(CONTENT_SECURITY_POLICY
            .ends_with("; report-uri https://csp.withgoogle.com/csp/amp"));
    }
}
