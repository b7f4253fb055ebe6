//! Experiment (`AMP_EXP`) injection into entry files.

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker the injected assignment is appended to.
pub const EXPERIMENTS_MARKER: &str = "/*AMP_CONFIG*/";

/// Closing marker written after the injected assignment.
const EXPERIMENTS_END_MARKER: &str = "/*AMP_EXP*/";

/// A single traffic experiment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Experiment {
    pub name: String,
    pub percentage: f64,
    /// Regex prefixes of the RTVs this experiment applies to. Absent means all.
    #[serde(rename = "rtvPrefixes", default, skip_serializing_if = "Option::is_none")]
    pub rtv_prefixes: Option<Vec<String>>,
}

impl Experiment {
    /// Whether the experiment runs on build `rtv`.
    ///
    /// Each prefix is a regular expression anchored at the start of the RTV.
    /// Prefixes that fail to compile never match.
    pub fn applies_to(&self, rtv: &str) -> bool {
        let Some(prefixes) = &self.rtv_prefixes else {
            return true;
        };

        prefixes.iter().any(|prefix| match Regex::new(&format!("^(?:{prefix})")) {
            Ok(re) => re.is_match(rtv),
            Err(e) => {
                tracing::warn!(
                    experiment = %self.name,
                    prefix = %prefix,
                    error = %e,
                    "Invalid RTV prefix"
                );
                false
            }
        })
    }
}

/// The experiment configuration stored under the experiments key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

impl ExperimentConfig {
    /// Interpret a stored JSON value, treating anything malformed as empty.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        match value.map(serde_json::from_value::<ExperimentConfig>) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Malformed experiment config, ignoring");
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Experiments running on `rtv`, in configuration order.
    pub fn applicable<'a>(&'a self, rtv: &'a str) -> impl Iterator<Item = &'a Experiment> + 'a {
        self.experiments.iter().filter(move |e| e.applies_to(rtv))
    }
}

/// Stable fingerprint of a configuration, used as the entry-file cache key.
pub fn config_fingerprint(config: &ExperimentConfig) -> String {
    let bytes = serde_json::to_vec(config).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

/// Inject the experiments applicable to `rtv` after the config marker.
pub fn inject_experiments<'a>(text: &'a str, rtv: &str, config: &ExperimentConfig) -> Cow<'a, str> {
    let Some(json) = experiments_json(config, rtv) else {
        tracing::info!(rtv, "No AMP_EXP defined for RTV, skipping injection");
        return Cow::Borrowed(text);
    };
    if !text.contains(EXPERIMENTS_MARKER) {
        return Cow::Borrowed(text);
    }

    tracing::debug!(rtv, "Injecting AMP_EXP");
    let replacement = format!("{EXPERIMENTS_MARKER}self.AMP_EXP={json};{EXPERIMENTS_END_MARKER}");
    Cow::Owned(text.replacen(EXPERIMENTS_MARKER, &replacement, 1))
}

/// `{name: percentage}` for the applicable experiments, or `None` if there are none.
///
/// Names keep their first position; a repeated name takes the last percentage.
fn experiments_json(config: &ExperimentConfig, rtv: &str) -> Option<String> {
    let mut entries: Vec<(&str, f64)> = Vec::new();
    for experiment in config.applicable(rtv) {
        match entries.iter_mut().find(|(name, _)| *name == experiment.name) {
            Some(entry) => entry.1 = experiment.percentage,
            None => entries.push((experiment.name.as_str(), experiment.percentage)),
        }
    }
    if entries.is_empty() {
        return None;
    }

    let fields: Vec<String> = entries
        .into_iter()
        .map(|(name, percentage)| {
            let key = serde_json::Value::from(name);
            format!("{key}:{}", number_json(percentage))
        })
        .collect();
    Some(format!("{{{}}}", fields.join(",")))
}

/// JSON number; integral values print without a fractional part.
fn number_json(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RTV: &str = "002105150310000";
    const INPUT: &str =
        r#"self.AMP_CONFIG={"v":"002105150310000"};/*AMP_CONFIG*/var global=self;…"#;

    fn experiment(name: &str, percentage: f64, prefixes: Option<&[&str]>) -> Experiment {
        Experiment {
            name: name.to_string(),
            percentage,
            rtv_prefixes: prefixes.map(|p| p.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_injects_applicable_experiments() {
        let config = ExperimentConfig {
            experiments: vec![
                experiment("foo", 0.5, Some(&["00"])),
                experiment("bar", 1.0, None),
                experiment("baz", 0.2, Some(&["..2105"])),
                experiment("qux", 0.2, Some(&["0.2106"])),
            ],
        };

        assert_eq!(
            inject_experiments(INPUT, RTV, &config),
            r#"self.AMP_CONFIG={"v":"002105150310000"};/*AMP_CONFIG*/self.AMP_EXP={"foo":0.5,"bar":1,"baz":0.2};/*AMP_EXP*/var global=self;…"#
        );
    }

    #[test]
    fn test_empty_config_is_skipped() {
        let out = inject_experiments(INPUT, RTV, &ExperimentConfig::default());
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_no_matching_rtv_is_skipped() {
        let config = ExperimentConfig {
            experiments: vec![experiment("foo", 0.5, Some(&["01"]))],
        };
        assert!(matches!(inject_experiments(INPUT, RTV, &config), Cow::Borrowed(_)));
    }

    #[test]
    fn test_invalid_prefix_never_matches() {
        let config = ExperimentConfig {
            experiments: vec![experiment("foo", 0.5, Some(&["(00"]))],
        };
        assert!(matches!(inject_experiments(INPUT, RTV, &config), Cow::Borrowed(_)));
    }

    #[test]
    fn test_prefix_is_anchored() {
        let exp = experiment("foo", 0.5, Some(&["2105"]));
        assert!(!exp.applies_to(RTV));
    }

    #[test]
    fn test_from_value() {
        let config = ExperimentConfig::from_value(Some(serde_json::json!({
            "experiments": [{"name": "foo", "percentage": 0.1, "rtvPrefixes": ["01"]}]
        })));
        assert_eq!(config.experiments, vec![experiment("foo", 0.1, Some(&["01"]))]);

        assert_eq!(ExperimentConfig::from_value(None), ExperimentConfig::default());
        assert_eq!(
            ExperimentConfig::from_value(Some(serde_json::json!({"experiments": "nope"}))),
            ExperimentConfig::default()
        );
    }

    #[test]
    fn test_fingerprint_tracks_config() {
        let a = ExperimentConfig {
            experiments: vec![experiment("foo", 0.5, None)],
        };
        let b = ExperimentConfig {
            experiments: vec![experiment("foo", 0.25, None)],
        };

        assert_eq!(config_fingerprint(&a), config_fingerprint(&a.clone()));
        assert_ne!(config_fingerprint(&a), config_fingerprint(&b));
        assert_eq!(config_fingerprint(&a).len(), 64);
    }
}
