//! Request handlers for every route class.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::error::EdgeError;
use crate::http::request::RequestContext;
use crate::http::response::{with_headers, CachePolicy, APPLICATION_JSON};
use crate::http::server::AppState;
use crate::inject::{
    self, config_fingerprint, geo_cache_key, inject_experiments, inject_geo, ExperimentConfig,
};
use crate::observability::metrics;
use crate::routing::{RouteKind, RouteMatch};
use crate::rtv::{rtv_metadata, Rtv};
use crate::security::headers::EXPERIMENTS_PAGE_HEADERS;
use crate::storage::{FetchError, ServedFile};

/// Entry point for every request.
pub async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, _body) = request.into_parts();

    if parts.method != Method::GET && parts.method != Method::HEAD {
        let response = EdgeError::MethodNotAllowed(parts.method).into_response();
        metrics::record_request("rejected", response.status().as_u16(), start_time);
        return response;
    }

    let ctx = RequestContext::from_parts(
        &parts,
        &state.config.geo,
        state.config.site.public_origin.as_deref(),
    );
    let route = state.router.match_path(&ctx.path);
    tracing::debug!(path = %ctx.path, route = route.kind.as_str(), "Routing request");

    let response = match dispatch(&state, &ctx, &route).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(route.kind.as_str(), response.status().as_u16(), start_time);
    response
}

async fn dispatch(
    state: &AppState,
    ctx: &RequestContext,
    route: &RouteMatch,
) -> Result<Response, EdgeError> {
    match route.kind {
        RouteKind::Redirect => Ok(redirect(&state.config.site.redirect_url)),
        RouteKind::Favicon => {
            let file = state
                .storage
                .fetch_immutable_url(&state.config.site.favicon_url, false)
                .await?;
            Ok(with_headers(file, CachePolicy::StaticRtvFile, &[]))
        }
        RouteKind::Metadata => metadata(state, ctx).await,
        RouteKind::VersionedGeo => {
            let (rtv, path) = versioned_params(route)?;
            geo_file(state, ctx, &rtv, path).await
        }
        RouteKind::VersionedFile => {
            let (rtv, path) = versioned_params(route)?;
            let file = state
                .storage
                .fetch_immutable_file(&rtv, path, ctx.accepts_brotli)
                .await?;
            Ok(with_headers(file, CachePolicy::StaticRtvFile, &[]))
        }
        RouteKind::EntryFile => entry_file(state, ctx).await,
        RouteKind::UnversionedGeo => {
            tracing::info!(path = %ctx.path, "Serving unversioned amp-geo request");
            let rtv = state.resolver.resolve(&ctx.signals()).await?;
            geo_file(state, ctx, &rtv, &ctx.path).await
        }
        RouteKind::ExperimentsPage => {
            let policy = CachePolicy::EntryFile;
            unversioned_file(state, ctx, policy, &EXPERIMENTS_PAGE_HEADERS).await
        }
        RouteKind::ServiceWorker => {
            unversioned_file(state, ctx, CachePolicy::ServiceWorker, &[]).await
        }
        RouteKind::Lts => unversioned_file(state, ctx, CachePolicy::Lts, &[]).await,
        RouteKind::Default => unversioned_file(state, ctx, CachePolicy::Default, &[]).await,
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(location, "Invalid redirect location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The RTV and file path captured by a versioned route.
///
/// Segments that are not a full RTV cannot name a stored build.
fn versioned_params(route: &RouteMatch) -> Result<(Rtv, &str), FetchError> {
    let rtv = route.params.get(0).and_then(Rtv::parse);
    match (rtv, route.params.get(1)) {
        (Some(rtv), Some(path)) => Ok((rtv, path)),
        _ => Err(FetchError::not_found()),
    }
}

async fn metadata(state: &AppState, ctx: &RequestContext) -> Result<Response, EdgeError> {
    tracing::info!("Generating /rtv/metadata");
    let metadata = rtv_metadata(state.versions.as_ref(), &ctx.origin).await?;
    let body = serde_json::to_vec(&metadata)?;

    Ok(with_headers(
        ServedFile::plain(body, Some(APPLICATION_JSON.to_string())),
        CachePolicy::RtvMetadata,
        &[(header::CONTENT_TYPE, APPLICATION_JSON)],
    ))
}

async fn entry_file(state: &AppState, ctx: &RequestContext) -> Result<Response, EdgeError> {
    tracing::info!(path = %ctx.path, "Serving unversioned entry-file request");

    let rtv = state.resolver.resolve(&ctx.signals()).await?;
    let experiments = state
        .config_store
        .get_json(&state.config.stores.experiments_key)
        .await?;
    let experiments = ExperimentConfig::from_value(experiments);

    let url = state.storage.file_url(&rtv, &ctx.path);
    let key = config_fingerprint(&experiments);

    serve_injected(state, ctx, &url, &key, CachePolicy::EntryFile, |file| {
        inject::apply(file, |text| inject_experiments(text, rtv.as_str(), &experiments))
    })
    .await
}

async fn geo_file(
    state: &AppState,
    ctx: &RequestContext,
    rtv: &Rtv,
    path: &str,
) -> Result<Response, EdgeError> {
    let country = ctx.country.as_deref();
    let region = ctx.region.as_deref();
    let url = state.storage.file_url(rtv, path);
    let key = geo_cache_key(country, region);

    serve_injected(state, ctx, &url, &key, CachePolicy::AmpGeo, |file| {
        inject::apply(file, |text| inject_geo(text, country, region))
    })
    .await
}

/// Serve an injected file from cache, or fetch, inject and cache it.
async fn serve_injected<F>(
    state: &AppState,
    ctx: &RequestContext,
    url: &str,
    key: &str,
    policy: CachePolicy,
    inject: F,
) -> Result<Response, EdgeError>
where
    F: FnOnce(ServedFile) -> ServedFile,
{
    if let Some(cached) = state.cache.lookup(url, key, ctx.accepts_brotli).await {
        tracing::debug!(url, key, "Serving injected file from cache");
        return Ok(with_headers(cached, policy, &[]));
    }
    tracing::debug!(url, key, "Injected cache miss");

    let file = inject(state.storage.fetch_immutable_url(url, false).await?);
    state.cache.enqueue_store(&file, url, key)?;
    Ok(with_headers(file, policy, &[]))
}

async fn unversioned_file(
    state: &AppState,
    ctx: &RequestContext,
    policy: CachePolicy,
    extra: &[(header::HeaderName, &str)],
) -> Result<Response, EdgeError> {
    tracing::info!(path = %ctx.path, "Serving unversioned request");

    let rtv = state.resolver.resolve(&ctx.signals()).await?;
    let file = state
        .storage
        .fetch_immutable_file(&rtv, &ctx.path, ctx.accepts_brotli)
        .await?;
    Ok(with_headers(file, policy, extra))
}
