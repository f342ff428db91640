use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::tags::TagSet;
use super::token::TypeToken;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeclFlags: u8 {
        /// Wins ambiguity tie-breaks among equally valid candidates.
        const DEFAULT     = 0b00000001;
        /// Participates in the interceptor post-pass.
        const INTERCEPTOR = 0b00000010;
    }
}

impl Default for DeclFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for DeclFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A factory parameter exactly as the discovery front end saw it. The type
/// is kept textual here; the claim parser turns it into a classified claim.
/// `type_repr` is `None` when the front end could not compute the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParameter {
    pub name: String,
    pub type_repr: Option<String>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub nullable: bool,
}

impl RawParameter {
    pub fn new(name: impl Into<String>, type_repr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_repr: Some(type_repr.into()),
            tags: TagSet::new(),
            nullable: false,
        }
    }
}

/// A component factory declaration, immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub produced: TypeToken,
    #[serde(default)]
    pub tags: TagSet,
    /// Declared supertypes the produced value also structurally satisfies.
    #[serde(default)]
    pub provides: Vec<TypeToken>,
    /// Named type variables. Non-empty means the produced type still
    /// contains unresolved variables and the declaration is a template.
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub params: Vec<RawParameter>,
    /// Source locator of the originating factory, carried into diagnostics.
    pub source: String,
    #[serde(default)]
    pub flags: DeclFlags,
}

impl Declaration {
    pub fn new(produced: TypeToken, source: impl Into<String>) -> Self {
        Self {
            produced,
            tags: TagSet::new(),
            provides: Vec::new(),
            type_params: Vec::new(),
            params: Vec::new(),
            source: source.into(),
            flags: DeclFlags::default(),
        }
    }

    pub fn is_template(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn is_default(&self) -> bool {
        self.flags.contains(DeclFlags::DEFAULT)
    }

    pub fn is_interceptor(&self) -> bool {
        self.flags.contains(DeclFlags::INTERCEPTOR)
    }

    /// Human-facing identity used in diagnostics.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.produced, self.source)
    }
}
