//! The `/rtv/metadata` document.

use serde::Serialize;

use crate::rtv::channel::Channel;
use crate::store::{StoreResult, VersionStore};

/// Published in place of the static file the build pipeline used to upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtvMetadata {
    pub amp_runtime_version: Option<String>,
    pub amp_css_url: Option<String>,
    pub canary_percentage: &'static str,
    pub diversions: Vec<String>,
    pub lts_runtime_version: Option<String>,
    pub lts_css_url: Option<String>,
}

/// Canary traffic share, reported as a string for compatibility.
const CANARY_PERCENTAGE: &str = "0.005";

/// Build the metadata document for the given public origin.
pub async fn rtv_metadata(versions: &dyn VersionStore, origin: &str) -> StoreResult<RtvMetadata> {
    let rtvs = versions.list().await?;
    let lookup = |channel: Channel| {
        rtvs.iter()
            .find(|(name, _)| name == channel.as_str())
            .map(|(_, rtv)| rtv.clone())
    };

    let stable = lookup(Channel::Stable);
    let lts = lookup(Channel::Lts);

    let mut diversions: Vec<String> = rtvs
        .iter()
        .map(|(_, rtv)| rtv)
        .filter(|rtv| Some(*rtv) != stable.as_ref() && Some(*rtv) != lts.as_ref())
        .cloned()
        .collect();
    diversions.sort_by_key(|rtv| diversion_order(rtv));
    diversions.dedup();

    let css_url = |rtv: &Option<String>| {
        rtv.as_ref()
            .map(|rtv| format!("{origin}/rtv/{rtv}/v0.css"))
    };

    Ok(RtvMetadata {
        amp_css_url: css_url(&stable),
        lts_css_url: css_url(&lts),
        amp_runtime_version: stable,
        canary_percentage: CANARY_PERCENTAGE,
        diversions,
        lts_runtime_version: lts,
    })
}

/// Order by build number, then by flavor prefix.
fn diversion_order(rtv: &str) -> (u64, u64, String) {
    let prefix = rtv.get(..2).unwrap_or(rtv);
    let build = rtv.get(2..).unwrap_or_default();
    (
        build.parse().unwrap_or(u64::MAX),
        prefix.parse().unwrap_or(u64::MAX),
        rtv.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvNamespace;

    #[tokio::test]
    async fn test_generates_metadata() {
        let kv = KvNamespace::from_entries(
            "RTV",
            [
                ("beta", "032105190310000"),
                ("control", "022105150310000"),
                ("experimental", "002105190310000"),
                ("lts", "012104031425006"),
                ("nightly", "042105220310000"),
                ("nightly-control", "052105150310000"),
                ("stable", "012105150310000"),
            ],
        );

        let metadata = rtv_metadata(&kv, "https://example.com").await.unwrap();

        assert_eq!(metadata.amp_runtime_version.as_deref(), Some("012105150310000"));
        assert_eq!(
            metadata.amp_css_url.as_deref(),
            Some("https://example.com/rtv/012105150310000/v0.css")
        );
        assert_eq!(
            metadata.diversions,
            vec![
                "022105150310000",
                "052105150310000",
                "002105190310000",
                "032105190310000",
                "042105220310000",
            ]
        );
        assert_eq!(metadata.lts_runtime_version.as_deref(), Some("012104031425006"));
        assert_eq!(
            metadata.lts_css_url.as_deref(),
            Some("https://example.com/rtv/012104031425006/v0.css")
        );
    }

    #[tokio::test]
    async fn test_serializes_camel_case_with_nulls() {
        let kv = KvNamespace::from_entries("RTV", [("beta-opt-in", "032105190310001")]);
        let metadata = rtv_metadata(&kv, "https://example.com").await.unwrap();
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["ampRuntimeVersion"], serde_json::Value::Null);
        assert_eq!(json["canaryPercentage"], "0.005");
        assert_eq!(json["diversions"], serde_json::json!(["032105190310001"]));
    }
}
