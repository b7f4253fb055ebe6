//! Route lookup.
//!
//! # Responsibilities
//! - Store the ordered route table
//! - Look up the route class of a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over a short table; first match wins
//! - The final route matches everything, so lookup never fails

use crate::routing::matcher::{
    AnyMatcher, ExactMatcher, Matcher, PathMatch, PathPrefixMatcher, PatternMatcher,
};

/// How a request path is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// `/`
    Redirect,
    /// `/favicon.ico`
    Favicon,
    /// `/rtv/metadata`
    Metadata,
    /// `/rtv/{rtv}/v0/amp-geo-*.js`; captures the RTV and file path.
    VersionedGeo,
    /// `/rtv/{rtv}/*`; captures the RTV and file path.
    VersionedFile,
    /// Unversioned entry files such as `/v0.js` or `/amp4ads-v0.mjs`.
    EntryFile,
    /// Unversioned amp-geo, optionally under `/lts`.
    UnversionedGeo,
    /// `/experiments.html`, optionally under `/lts`.
    ExperimentsPage,
    /// Service worker scripts, optionally under `/lts`.
    ServiceWorker,
    /// Any other `/lts/` file.
    Lts,
    /// Any other unversioned file.
    Default,
}

impl RouteKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Redirect => "redirect",
            RouteKind::Favicon => "favicon",
            RouteKind::Metadata => "metadata",
            RouteKind::VersionedGeo => "versioned_geo",
            RouteKind::VersionedFile => "versioned_file",
            RouteKind::EntryFile => "entry_file",
            RouteKind::UnversionedGeo => "unversioned_geo",
            RouteKind::ExperimentsPage => "experiments_page",
            RouteKind::ServiceWorker => "service_worker",
            RouteKind::Lts => "lts",
            RouteKind::Default => "default",
        }
    }
}

/// A matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub kind: RouteKind,
    pub params: PathMatch,
}

#[derive(Debug)]
struct Route {
    kind: RouteKind,
    matcher: Box<dyn Matcher>,
}

/// The edge's route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Build the route table.
    pub fn new() -> Result<Self, regex::Error> {
        let routes = vec![
            route(RouteKind::Redirect, ExactMatcher::new(["/"])),
            route(RouteKind::Favicon, ExactMatcher::new(["/favicon.ico"])),
            route(RouteKind::Metadata, ExactMatcher::new(["/rtv/metadata"])),
            route(
                RouteKind::VersionedGeo,
                PatternMatcher::new(r"^/rtv/(\d+)(/v0/amp-geo-.+\.m?js)$")?,
            ),
            route(RouteKind::VersionedFile, PatternMatcher::new(r"^/rtv/([^/]+)(/.*)$")?),
            route(RouteKind::EntryFile, PatternMatcher::new(r"^/(?:\w+-)?v0\.m?js$")?),
            route(
                RouteKind::UnversionedGeo,
                PatternMatcher::new(r"^(?:/lts)?/v0/amp-geo-.+\.m?js$")?,
            ),
            route(
                RouteKind::ExperimentsPage,
                ExactMatcher::new(["/experiments.html", "/lts/experiments.html"]),
            ),
            route(RouteKind::ServiceWorker, PathPrefixMatcher::new(["/sw/", "/lts/sw/"])),
            route(RouteKind::Lts, PathPrefixMatcher::new(["/lts/"])),
            route(RouteKind::Default, AnyMatcher),
        ];

        Ok(Self { routes })
    }

    /// Find the first route matching `path`.
    pub fn match_path(&self, path: &str) -> RouteMatch {
        self.routes
            .iter()
            .find_map(|route| {
                route.matcher.matches(path).map(|params| RouteMatch {
                    kind: route.kind,
                    params,
                })
            })
            .unwrap_or(RouteMatch {
                kind: RouteKind::Default,
                params: PathMatch::default(),
            })
    }
}

fn route(kind: RouteKind, matcher: impl Matcher + 'static) -> Route {
    Route {
        kind,
        matcher: Box::new(matcher),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(path: &str) -> RouteKind {
        Router::new().unwrap().match_path(path).kind
    }

    #[test]
    fn test_fixed_routes() {
        assert_eq!(kind("/"), RouteKind::Redirect);
        assert_eq!(kind("/favicon.ico"), RouteKind::Favicon);
        assert_eq!(kind("/rtv/metadata"), RouteKind::Metadata);
    }

    #[test]
    fn test_versioned_routes() {
        let router = Router::new().unwrap();

        let m = router.match_path("/rtv/012105150310000/v0/amp-geo-0.1.js");
        assert_eq!(m.kind, RouteKind::VersionedGeo);
        assert_eq!(m.params.get(0), Some("012105150310000"));
        assert_eq!(m.params.get(1), Some("/v0/amp-geo-0.1.js"));

        let m = router.match_path("/rtv/012105150310000/v0.js");
        assert_eq!(m.kind, RouteKind::VersionedFile);
        assert_eq!(m.params.get(1), Some("/v0.js"));
    }

    #[test]
    fn test_entry_files() {
        assert_eq!(kind("/v0.js"), RouteKind::EntryFile);
        assert_eq!(kind("/v0.mjs"), RouteKind::EntryFile);
        assert_eq!(kind("/amp4ads-v0.js"), RouteKind::EntryFile);
        assert_eq!(kind("/shadow-v0.mjs"), RouteKind::EntryFile);
        assert_eq!(kind("/lts/v0.js"), RouteKind::Lts);
    }

    #[test]
    fn test_unversioned_geo() {
        assert_eq!(kind("/v0/amp-geo-0.1.js"), RouteKind::UnversionedGeo);
        assert_eq!(kind("/lts/v0/amp-geo-0.1.mjs"), RouteKind::UnversionedGeo);
        assert_eq!(kind("/v0/amp-geo-0.1.css"), RouteKind::Default);
    }

    #[test]
    fn test_lts_and_service_worker() {
        assert_eq!(kind("/experiments.html"), RouteKind::ExperimentsPage);
        assert_eq!(kind("/lts/experiments.html"), RouteKind::ExperimentsPage);
        assert_eq!(kind("/sw/amp-sw.js"), RouteKind::ServiceWorker);
        assert_eq!(kind("/lts/sw/amp-sw.js"), RouteKind::ServiceWorker);
        assert_eq!(kind("/lts/v0/amp-bind-0.1.js"), RouteKind::Lts);
    }

    #[test]
    fn test_default_route() {
        assert_eq!(kind("/v0/amp-bind-0.1.js"), RouteKind::Default);
        assert_eq!(kind("/rtv/abc"), RouteKind::Default);
        assert_eq!(kind("/caches.json"), RouteKind::Default);
    }
}
