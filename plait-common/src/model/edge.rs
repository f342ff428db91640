use serde::{Deserialize, Serialize};

use super::token::TypeToken;

/// How one resolved dependency was satisfied. The emission back end
/// pattern-matches this union exhaustively, so the set is closed on purpose.
///
/// `target` and `placeholder` are indices into the resolved component table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edge {
    /// Plain reference to an already-constructed component.
    Direct { target: usize },
    /// Reference through a wrapper container that must be unwrapped first.
    Unwrap { target: usize },
    /// Lazy handle; the target is constructed on first use.
    Lazy { target: usize },
    /// Forward promise, possibly aimed at a cycle-breaking proxy entry.
    Promise { target: usize },
    /// Ordered list of sub-edges for a collect-all claim.
    Collect { elements: Vec<Edge> },
    /// Type token literal; no runtime value is referenced.
    TokenLiteral { token: TypeToken },
    /// Unsatisfied optional claim.
    Null,
    /// Cycle-break placeholder reference.
    ProxyParam { placeholder: usize },
}

impl Edge {
    /// Component indices this edge references, in order. Collect edges
    /// flatten into their elements.
    pub fn references(&self) -> Vec<usize> {
        match self {
            Edge::Direct { target }
            | Edge::Unwrap { target }
            | Edge::Lazy { target }
            | Edge::Promise { target } => vec![*target],
            Edge::Collect { elements } => {
                elements.iter().flat_map(|e| e.references()).collect()
            }
            Edge::TokenLiteral { .. } | Edge::Null => Vec::new(),
            Edge::ProxyParam { placeholder } => vec![*placeholder],
        }
    }

    /// True for edge shapes that defer the target past construction time
    /// and are therefore exempt from the strict index ordering invariant.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Edge::Promise { .. } | Edge::ProxyParam { .. })
    }
}
