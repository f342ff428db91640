use std::fmt;

use serde::{Deserialize, Serialize};

use super::tags::TagSet;
use super::token::TypeToken;

/// How many targets a claim binds and through which indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ExactlyOne,
    Optional,
    Lazy,
    OptionalLazy,
    Promise,
    OptionalPromise,
    TokenOnly,
    CollectAll,
    CollectAllLazy,
    CollectAllPromise,
}

impl Cardinality {
    /// Zero matches produce a null edge instead of an error.
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalLazy | Self::OptionalPromise)
    }

    pub fn is_collect(self) -> bool {
        matches!(
            self,
            Self::CollectAll | Self::CollectAllLazy | Self::CollectAllPromise
        )
    }

    pub fn is_promise(self) -> bool {
        matches!(self, Self::Promise | Self::OptionalPromise)
    }

    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Lazy | Self::OptionalLazy)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single dependency requirement declared by a factory parameter (or a
/// consumer root request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub requested: TypeToken,
    #[serde(default)]
    pub tags: TagSet,
    pub cardinality: Cardinality,
    /// Owning parameter name, for diagnostics.
    #[serde(default)]
    pub parameter: String,
}

impl Claim {
    pub fn new(requested: TypeToken, tags: TagSet, cardinality: Cardinality) -> Self {
        Self {
            requested,
            tags,
            cardinality,
            parameter: String::new(),
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} with tags {}",
            self.cardinality, self.requested, self.tags
        )
    }
}
