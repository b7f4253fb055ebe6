//! Dynamic content injection into runtime files.
//!
//! # Responsibilities
//! - Rewrite experiment and geography placeholders in fetched files
//! - Leave files untouched whenever there is nothing to inject
//!
//! # Design Decisions
//! - Injectors are pure `&str -> Cow<str>` functions; `Cow::Borrowed` means
//!   "skip" so callers keep the original bytes without a copy
//! - Only the first occurrence of a marker is replaced

pub mod experiments;
pub mod geo;

use std::borrow::Cow;

use crate::storage::ServedFile;

pub use experiments::{config_fingerprint, inject_experiments, Experiment, ExperimentConfig};
pub use geo::{geo_cache_key, inject_geo};

/// Run a text injector over a fetched file.
///
/// Files without a body or with a body that is not UTF-8 are returned as-is.
pub fn apply<F>(file: ServedFile, inject: F) -> ServedFile
where
    F: for<'a> FnOnce(&'a str) -> Cow<'a, str>,
{
    let Some(body) = file.body.as_ref() else {
        return file;
    };

    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Body is not UTF-8, skipping injection");
            return file;
        }
    };

    match inject(text) {
        Cow::Borrowed(_) => file,
        Cow::Owned(injected) => file.with_body(injected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_body() {
        let file = ServedFile::plain("hello", Some("text/plain".to_string()));
        let out = apply(file, |text| Cow::Owned(text.to_uppercase()));

        assert_eq!(out.body.as_deref(), Some(&b"HELLO"[..]));
        assert_eq!(out.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_apply_skips_invalid_utf8() {
        let file = ServedFile::plain(vec![0xff, 0xfe], None);
        let out = apply(file.clone(), |text| Cow::Owned(text.to_string() + "!"));

        assert_eq!(out, file);
    }

    #[test]
    fn test_apply_borrowed_keeps_original() {
        let file = ServedFile::plain("unchanged", None);
        let out = apply(file.clone(), |text| Cow::Borrowed(text));

        assert_eq!(out, file);
    }
}
