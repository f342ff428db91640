use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An unordered set of qualifier identifiers. Empty means untagged, which
/// makes the owner default-eligible. Iteration order is sorted so every
/// downstream walk is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether this (candidate) tag set satisfies a non-empty required set
    /// under the given policy. Empty required sets are handled by the
    /// candidate-selection tiers in the resolver, not here.
    pub fn satisfies(&self, required: &TagSet, policy: TagMatchPolicy) -> bool {
        match policy {
            TagMatchPolicy::Exact => self.0 == required.0,
            TagMatchPolicy::Superset => required.0.is_subset(&self.0),
            TagMatchPolicy::Overlap => !required.0.is_disjoint(&self.0),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tag}")?;
        }
        write!(f, "]")
    }
}

/// How a claim's required tags are matched against a candidate's declared
/// tags. Kept as an explicit policy so the rule is testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatchPolicy {
    /// Declared set must equal the required set.
    Exact,
    /// Declared set must contain every required tag.
    Superset,
    /// Declared set must share at least one tag with the required set.
    Overlap,
}

impl Default for TagMatchPolicy {
    fn default() -> Self {
        Self::Superset
    }
}

impl fmt::Display for TagMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Superset => "superset",
            Self::Overlap => "overlap",
        };
        write!(f, "{name}")
    }
}

impl FromStr for TagMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "superset" => Ok(Self::Superset),
            "overlap" => Ok(Self::Overlap),
            other => Err(format!(
                "unknown tag policy '{other}' (expected exact, superset or overlap)"
            )),
        }
    }
}
