//! Resolved component table: an insertion-ordered, append-only arena of
//! resolved components. Components reference each other by integer index,
//! never by direct object reference, so cyclic graphs need no cyclic
//! ownership; proxy entries are ordinary indexed rows whose real target is
//! patched in after the target lands.

use std::collections::HashMap;

use plait_common::model::declaration::Declaration;
use plait_common::model::edge::Edge;
use plait_common::model::tags::TagSet;
use plait_common::model::token::TypeToken;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// An ordinary factory-built component.
    Factory,
    /// A cycle-breaking placeholder. `target` is the table index of the real
    /// component once it has been resolved; it is deferred to first use at
    /// runtime regardless of table position.
    Proxy { target: Option<usize> },
}

#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub index: usize,
    /// Registry index of the owning declaration (for proxies, of the target
    /// declaration).
    pub declaration: usize,
    pub source: String,
    pub produced: TypeToken,
    pub tags: TagSet,
    pub role: Role,
    pub edges: Vec<Edge>,
    /// Interceptor component indices applied to this component, outermost
    /// first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wrappers: Vec<usize>,
}

/// The instantiation plan. Table order is a safe construction order: every
/// non-deferred edge points strictly backwards. `Clone` supports the
/// speculative branches taken during extension-driven synthesis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    components: Vec<Component>,
    #[serde(skip)]
    by_declaration: HashMap<usize, usize>,
    #[serde(skip)]
    proxy_by_target: HashMap<usize, usize>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fully resolved component and memoizes it under its
    /// declaration index. The new table index is the next sequential one.
    pub fn add(&mut self, declaration_index: usize, declaration: &Declaration, edges: Vec<Edge>) -> usize {
        let index = self.components.len();
        self.components.push(Component {
            index,
            declaration: declaration_index,
            source: declaration.source.clone(),
            produced: declaration.produced.clone(),
            tags: declaration.tags.clone(),
            role: Role::Factory,
            edges,
            wrappers: Vec::new(),
        });
        self.by_declaration.insert(declaration_index, index);
        debug!(
            "Plan[{index}] <- {} ({} edge(s))",
            declaration.describe(),
            self.components[index].edges.len()
        );
        index
    }

    /// Returns the proxy entry bound to the given in-progress declaration,
    /// creating it on first use. One proxy per target, ever.
    pub fn ensure_proxy(&mut self, target_declaration: usize, declaration: &Declaration) -> usize {
        if let Some(&existing) = self.proxy_by_target.get(&target_declaration) {
            return existing;
        }
        let index = self.components.len();
        self.components.push(Component {
            index,
            declaration: target_declaration,
            source: declaration.source.clone(),
            produced: declaration.produced.clone(),
            tags: declaration.tags.clone(),
            role: Role::Proxy { target: None },
            edges: Vec::new(),
            wrappers: Vec::new(),
        });
        self.proxy_by_target.insert(target_declaration, index);
        debug!(
            "Plan[{index}] <- proxy for in-progress {}",
            declaration.describe()
        );
        index
    }

    /// Patches the proxy bound to `target_declaration` (if any) with the
    /// table index its target resolved to.
    pub fn patch_proxy(&mut self, target_declaration: usize, resolved_index: usize) {
        if let Some(&proxy_index) = self.proxy_by_target.get(&target_declaration) {
            debug!("Plan[{proxy_index}] proxy target patched to {resolved_index}");
            self.components[proxy_index].role = Role::Proxy {
                target: Some(resolved_index),
            };
        }
    }

    pub fn proxy_for(&self, target_declaration: usize) -> Option<usize> {
        self.proxy_by_target.get(&target_declaration).copied()
    }

    /// O(1) "already resolved" lookup used by the resolution algorithm.
    pub fn get_by_declaration(&self, declaration_index: usize) -> Option<usize> {
        self.by_declaration.get(&declaration_index).copied()
    }

    pub fn add_wrapper(&mut self, component_index: usize, interceptor_index: usize) {
        self.components[component_index]
            .wrappers
            .push(interceptor_index);
    }

    /// The final ordered sequence: the safe instantiation order, modulo
    /// proxy-deferred edges which resolve lazily regardless of position.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
