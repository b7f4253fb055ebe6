//! Channels and RTV identifiers.

use std::fmt;
use std::str::FromStr;

/// Number of digits in an explicit RTV.
pub const RTV_LENGTH: usize = 15;

/// Two-digit RTV prefixes whose `/v0/` files are byte-identical to the `01` build.
pub const V0_DEDUP_RTV_PREFIXES: [&str; 8] = ["00", "02", "03", "04", "05", "20", "22", "24"];

/// Prefix the deduplicated builds collapse to.
pub const CANONICAL_RTV_PREFIX: &str = "01";

/// Release channels known to the version store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stable,
    Control,
    Lts,
    Beta,
    Experimental,
    Nightly,
    NightlyControl,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Stable,
        Channel::Control,
        Channel::Lts,
        Channel::Beta,
        Channel::Experimental,
        Channel::Nightly,
        Channel::NightlyControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Control => "control",
            Channel::Lts => "lts",
            Channel::Beta => "beta",
            Channel::Experimental => "experimental",
            Channel::Nightly => "nightly",
            Channel::NightlyControl => "nightly-control",
        }
    }

    /// Beta and experimental have separate opt-in and traffic builds.
    pub fn has_opt_in_variant(&self) -> bool {
        matches!(self, Channel::Beta | Channel::Experimental)
    }

    /// Store key read for users who explicitly opted in to this channel.
    pub fn opt_in_key(&self) -> String {
        if self.has_opt_in_variant() {
            format!("{}-opt-in", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }

    /// Store key serving the regular traffic share of this channel.
    pub fn traffic_key(&self) -> String {
        if self.has_opt_in_variant() {
            format!("{}-traffic", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or(())
    }
}

/// Store key for an opt-in value that is a channel name or anything else.
///
/// Unknown names are looked up verbatim; they simply miss in the store.
pub fn opt_in_store_key(value: &str) -> String {
    match value.parse::<Channel>() {
        Ok(channel) => channel.opt_in_key(),
        Err(()) => value.to_string(),
    }
}

/// An explicit runtime version: exactly fifteen ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rtv(String);

impl Rtv {
    /// Parse a literal RTV, returning `None` for channel names and garbage.
    pub fn parse(value: &str) -> Option<Self> {
        (value.len() == RTV_LENGTH && value.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(value.to_string()))
    }

    /// Wrap a value read from the version store.
    ///
    /// Store values are trusted as-is; they are only ever written by the syncer.
    pub fn from_store(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-digit build-flavor prefix.
    pub fn prefix(&self) -> &str {
        self.0.get(..2).unwrap_or(&self.0)
    }

    /// The RTV whose `/v0/` files this build shares.
    pub fn canonical_for_v0(&self) -> Rtv {
        if V0_DEDUP_RTV_PREFIXES.contains(&self.prefix()) {
            Rtv(format!("{}{}", CANONICAL_RTV_PREFIX, &self.0[2..]))
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Rtv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Rtv {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_in_keys() {
        assert_eq!(opt_in_store_key("beta"), "beta-opt-in");
        assert_eq!(opt_in_store_key("experimental"), "experimental-opt-in");
        assert_eq!(opt_in_store_key("nightly"), "nightly");
        assert_eq!(opt_in_store_key("kittens"), "kittens");
        assert_eq!(Channel::Beta.traffic_key(), "beta-traffic");
        assert_eq!(Channel::Stable.traffic_key(), "stable");
    }

    #[test]
    fn test_channel_round_trip_names() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>(), Ok(channel));
        }
        assert!("Stable".parse::<Channel>().is_err());
    }

    #[test]
    fn test_literal_rtv_detection() {
        assert!(Rtv::parse("111112222233333").is_some());
        assert!(Rtv::parse("11111222223333").is_none());
        assert!(Rtv::parse("1111122222333334").is_none());
        assert!(Rtv::parse("11111222223333a").is_none());
        assert!(Rtv::parse("beta").is_none());
        assert!(Rtv::parse("").is_none());
    }

    #[test]
    fn test_v0_prefix_collapse() {
        let rtv = Rtv::parse("022105150310000").unwrap();
        assert_eq!(rtv.canonical_for_v0().as_str(), "012105150310000");

        let rtv = Rtv::parse("212105150310000").unwrap();
        assert_eq!(rtv.canonical_for_v0().as_str(), "212105150310000");

        let rtv = Rtv::parse("012105150310000").unwrap();
        assert_eq!(rtv.canonical_for_v0(), rtv);
    }
}
