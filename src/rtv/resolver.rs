//! Channel-fallback RTV resolution.

use std::sync::Arc;

use thiserror::Error;

use crate::observability::metrics;
use crate::rtv::channel::{opt_in_store_key, Channel, Rtv};
use crate::store::{StoreError, VersionStore};

/// Errors raised while resolving an RTV.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Not even `stable` resolved. Operator misconfiguration, never a client fault.
    #[error(
        "No available RTV channel was chosen (tried {tried:?}). This is a server error, due to missing `stable` channel config"
    )]
    Exhausted { tried: Vec<String> },

    #[error("version store read failed: {0}")]
    Store(#[from] StoreError),
}

/// Per-request inputs that influence which RTV is served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSignals {
    /// Value of the opt-in cookie.
    pub cookie_opt_in: Option<String>,
    /// Value of the `optin` query parameter.
    pub query_opt_in: Option<String>,
    /// Whether the request path is under `/lts/`.
    pub is_lts: bool,
}

impl RequestSignals {
    /// Ordered store keys (or literal RTVs) to try.
    pub fn candidates(&self) -> Vec<String> {
        let opt_ins = [self.cookie_opt_in.as_deref(), self.query_opt_in.as_deref()];
        let mut candidates: Vec<String> = opt_ins
            .into_iter()
            .flatten()
            .filter(|value| !value.is_empty())
            .map(opt_in_store_key)
            .collect();

        if self.is_lts {
            candidates.push(Channel::Lts.as_str().to_string());
        }
        candidates.push(Channel::Stable.as_str().to_string());
        candidates
    }
}

/// Chooses the RTV for unversioned requests.
#[derive(Clone)]
pub struct RtvResolver {
    versions: Arc<dyn VersionStore>,
}

impl RtvResolver {
    pub fn new(versions: Arc<dyn VersionStore>) -> Self {
        Self { versions }
    }

    /// Resolve the first candidate that names a literal RTV or a populated channel.
    pub async fn resolve(&self, signals: &RequestSignals) -> Result<Rtv, ResolveError> {
        let candidates = signals.candidates();

        for candidate in &candidates {
            if let Some(rtv) = Rtv::parse(candidate) {
                tracing::debug!(rtv = %rtv, "Explicit RTV requested");
                metrics::record_rtv_resolution("literal");
                return Ok(rtv);
            }

            if let Some(rtv) = self.versions.get(candidate).await? {
                tracing::debug!(channel = %candidate, rtv = %rtv, "Channel resolved");
                metrics::record_rtv_resolution("store");
                return Ok(Rtv::from_store(rtv));
            }
        }

        metrics::record_rtv_resolution("exhausted");
        Err(ResolveError::Exhausted { tried: candidates })
    }

    /// Fail unless the `stable` channel is populated.
    pub async fn ensure_stable(&self) -> Result<Rtv, ResolveError> {
        match self.versions.get(Channel::Stable.as_str()).await? {
            Some(rtv) => Ok(Rtv::from_store(rtv)),
            None => Err(ResolveError::Exhausted {
                tried: vec![Channel::Stable.as_str().to_string()],
            }),
        }
    }
}
