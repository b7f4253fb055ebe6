//! Country and region hot-patching for amp-geo.

use std::borrow::Cow;

/// Placeholder compiled into amp-geo builds.
pub const GEO_PLACEHOLDER: &str = "{{AMP_ISO_COUNTRY_HOTPATCH}}";

/// Width the replacement is padded to so the file length never changes.
const GEO_FIELD_WIDTH: usize = GEO_PLACEHOLDER.len();

/// Replace the amp-geo placeholder with the visitor's ISO codes.
///
/// Produces `"{country}"` or `"{country} {country}-{region}"`, lowercased and
/// padded with trailing spaces. Without a country the text is unchanged.
pub fn inject_geo<'a>(text: &'a str, country: Option<&str>, region: Option<&str>) -> Cow<'a, str> {
    let Some(country) = country.filter(|c| !c.is_empty()) else {
        tracing::warn!("ISO country code is empty, skipping amp-geo injection");
        return Cow::Borrowed(text);
    };
    if !text.contains(GEO_PLACEHOLDER) {
        return Cow::Borrowed(text);
    }

    let iso = match region.filter(|r| !r.is_empty()) {
        Some(region) => format!("{country} {country}-{region}"),
        None => country.to_string(),
    };
    let replacement = format!("{:<width$}", iso.to_lowercase(), width = GEO_FIELD_WIDTH);

    tracing::debug!(iso = %iso, "Injecting amp-geo ISO country code");
    Cow::Owned(text.replacen(GEO_PLACEHOLDER, &replacement, 1))
}

/// Dynamic cache key of a geo-injected file.
pub fn geo_cache_key(country: Option<&str>, region: Option<&str>) -> String {
    format!("{};{}", country.unwrap_or_default(), region.unwrap_or_default())
}
