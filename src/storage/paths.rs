//! Canonical storage locations of immutable runtime files.

use crate::rtv::Rtv;

/// Namespace of unversioned long-term-support requests.
pub const LTS_PREFIX: &str = "/lts";

/// Namespace of runtime entry files whose builds deduplicate across flavors.
pub const V0_PREFIX: &str = "/v0/";

/// Whether a request path lives under the LTS namespace.
pub fn is_lts_path(path: &str) -> bool {
    path.strip_prefix(LTS_PREFIX)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Build the storage URL of `path` within build `rtv`.
///
/// `path` must start with `/`. A leading `/lts` is dropped since LTS builds
/// are stored like any other, and `/v0/` files of deduplicated flavors are
/// read from the canonical build.
pub fn immutable_file_url(base_url: &str, rtv: &Rtv, path: &str) -> String {
    let path = if is_lts_path(path) {
        &path[LTS_PREFIX.len()..]
    } else {
        path
    };

    let rtv = if path.starts_with(V0_PREFIX) {
        rtv.canonical_for_v0()
    } else {
        rtv.clone()
    };

    format!("{base_url}{rtv}{path}")
}
