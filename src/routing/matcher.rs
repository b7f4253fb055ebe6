//! Path matching logic.
//!
//! # Responsibilities
//! - Match request paths exactly, by prefix, or against a compiled pattern
//! - Extract the path segments a handler needs (RTV, file path)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Patterns are compiled once when the route table is built

use regex::Regex;

/// Result of a successful match: captured path segments, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    pub captures: Vec<String>,
}

impl PathMatch {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }
}

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the captures if the path matches this condition.
    fn matches(&self, path: &str) -> Option<PathMatch>;
}

/// Matches any of a fixed set of paths.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    paths: Vec<String>,
}

impl ExactMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for ExactMatcher {
    fn matches(&self, path: &str) -> Option<PathMatch> {
        self.paths
            .iter()
            .any(|p| p == path)
            .then(PathMatch::default)
    }
}

/// Matches paths starting with any of the given prefixes.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<String>,
}

impl PathPrefixMatcher {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> Option<PathMatch> {
        self.prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
            .then(PathMatch::default)
    }
}

/// Matches a regular expression, capturing its groups.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Matcher for PatternMatcher {
    fn matches(&self, path: &str) -> Option<PathMatch> {
        let captures = self.pattern.captures(path)?;
        Some(PathMatch {
            captures: captures
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        })
    }
}

/// Matches every path.
#[derive(Debug, Clone, Default)]
pub struct AnyMatcher;

impl Matcher for AnyMatcher {
    fn matches(&self, _path: &str) -> Option<PathMatch> {
        Some(PathMatch::default())
    }
}
