//! The resolution algorithm. For a set of root claims it matches claims to
//! registered declarations, synthesizes declarations on demand through the
//! extension provider, breaks dependency cycles with proxy entries, and
//! builds the instantiation plan with one concrete edge per claim.
//!
//! Descent is driven by an explicit frame stack rather than native
//! recursion, so depth is bounded by declaration count, not thread stack.
//! Failures stay local to the root that requested them: unrelated roots
//! keep resolving and the final report carries every failure from one pass.

use std::collections::HashSet;

use plait_common::error::{PlaitError, Result};
use plait_common::model::claim::{Cardinality, Claim};
use plait_common::model::declaration::Declaration;
use plait_common::model::edge::Edge;
use plait_common::model::tags::{TagMatchPolicy, TagSet};
use plait_common::model::token::{containers, TypeToken};
use tracing::{debug, warn};

use crate::claims;
use crate::extension::Extension;
use crate::plan::{Plan, Role};
use crate::registry::{Access, Candidate, Registry};

/// The outcome of one root claim: the edge the emission back end should use
/// for it, or the error that broke it.
#[derive(Debug, Clone)]
pub struct RootOutcome {
    pub claim: Claim,
    pub result: Result<Edge>,
}

/// Everything a single resolution pass produced. The registry is handed
/// back because extension synthesis may have enriched it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub plan: Plan,
    pub roots: Vec<RootOutcome>,
    /// Failures not owned by any single root (interceptor problems).
    pub diagnostics: Vec<PlaitError>,
    pub registry: Registry,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty() && self.roots.iter().all(|r| r.result.is_ok())
    }

    pub fn failed_roots(&self) -> impl Iterator<Item = &RootOutcome> {
        self.roots.iter().filter(|r| r.result.is_err())
    }
}

struct Frame {
    decl: usize,
    describe: String,
    claims: Vec<Claim>,
    edges: Vec<Edge>,
    next: usize,
}

enum ClaimProgress {
    Edge(Edge),
    Descend(usize),
}

pub struct Resolver<'a> {
    registry: Registry,
    extension: Option<&'a dyn Extension>,
    policy: TagMatchPolicy,
    plan: Plan,
    in_progress: HashSet<usize>,
    synth_in_flight: HashSet<(TypeToken, TagSet)>,
    outcomes: Vec<RootOutcome>,
    diagnostics: Vec<PlaitError>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: Registry, policy: TagMatchPolicy) -> Self {
        Self {
            registry,
            extension: None,
            policy,
            plan: Plan::new(),
            in_progress: HashSet::new(),
            synth_in_flight: HashSet::new(),
            outcomes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_extension(mut self, extension: &'a dyn Extension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Resolves every root claim in order, then applies the interceptor
    /// post-pass. One broken root never aborts the others.
    pub fn resolve_roots(mut self, roots: &[Claim]) -> Resolution {
        for claim in roots {
            debug!("Resolving root claim: {claim}");
            let result = self.resolve_root_claim(claim);
            if let Err(e) = &result {
                warn!("Resolution failed for root '{claim}', but continuing for others: {e}");
            }
            self.outcomes.push(RootOutcome {
                claim: claim.clone(),
                result,
            });
        }

        self.apply_interceptors();

        Resolution {
            plan: self.plan,
            roots: self.outcomes,
            diagnostics: self.diagnostics,
            registry: self.registry,
        }
    }

    fn resolve_root_claim(&mut self, claim: &Claim) -> Result<Edge> {
        loop {
            match self.satisfy_claim(claim, "root request")? {
                ClaimProgress::Edge(edge) => return Ok(edge),
                ClaimProgress::Descend(decl) => {
                    self.resolve_declaration(decl)?;
                }
            }
        }
    }

    /// Fully resolves one declaration (and, transitively, everything it
    /// needs) into the plan, returning its table index.
    fn resolve_declaration(&mut self, decl: usize) -> Result<usize> {
        if let Some(index) = self.plan.get_by_declaration(decl) {
            return Ok(index);
        }
        let mut stack: Vec<Frame> = Vec::new();
        let result = self.run_stack(&mut stack, decl);
        if result.is_err() {
            // Unwind the in-progress markers of every abandoned frame so an
            // unrelated root can still resolve these declarations later.
            for frame in &stack {
                self.in_progress.remove(&frame.decl);
            }
        }
        result
    }

    fn run_stack(&mut self, stack: &mut Vec<Frame>, root: usize) -> Result<usize> {
        stack.push(self.open_frame(root)?);
        loop {
            let done = {
                let frame = stack.last().expect("stack never empty inside loop");
                frame.next >= frame.claims.len()
            };
            if done {
                let frame = stack.pop().expect("stack never empty inside loop");
                let declaration = self.registry.declaration(frame.decl).clone();
                let index = self.plan.add(frame.decl, &declaration, frame.edges);
                self.in_progress.remove(&frame.decl);
                self.plan.patch_proxy(frame.decl, index);
                debug!("Finished resolving {} as plan[{index}]", frame.describe);
                if stack.is_empty() {
                    return Ok(index);
                }
                continue;
            }

            let (claim, requester) = {
                let frame = stack.last().expect("stack never empty inside loop");
                (frame.claims[frame.next].clone(), frame.describe.clone())
            };
            match self.satisfy_claim(&claim, &requester)? {
                ClaimProgress::Edge(edge) => {
                    let frame = stack.last_mut().expect("stack never empty inside loop");
                    frame.edges.push(edge);
                    frame.next += 1;
                }
                ClaimProgress::Descend(child) => {
                    stack.push(self.open_frame(child)?);
                }
            }
        }
    }

    fn open_frame(&mut self, decl: usize) -> Result<Frame> {
        debug_assert!(
            !self.in_progress.contains(&decl),
            "descending into a declaration that is already in progress"
        );
        let declaration = self.registry.declaration(decl);
        let describe = declaration.describe();
        let claims = claims::parse_declaration_claims(declaration)?;
        debug!("Descending into {describe} ({} claim(s))", claims.len());
        self.in_progress.insert(decl);
        Ok(Frame {
            decl,
            describe,
            claims,
            edges: Vec::new(),
            next: 0,
        })
    }

    fn satisfy_claim(&mut self, claim: &Claim, requester: &str) -> Result<ClaimProgress> {
        match claim.cardinality {
            Cardinality::TokenOnly => Ok(ClaimProgress::Edge(Edge::TokenLiteral {
                token: claim.requested.clone(),
            })),
            c if c.is_collect() => self.satisfy_collect(claim),
            _ => self.satisfy_single(claim, requester),
        }
    }

    fn satisfy_single(&mut self, claim: &Claim, requester: &str) -> Result<ClaimProgress> {
        let selected = self.select_single(claim, requester)?;
        let Some(candidate) = selected else {
            if let Some(index) = self.try_synthesize(claim)? {
                return Ok(ClaimProgress::Edge(self.edge_for(claim, Access::Direct, index)));
            }
            if claim.cardinality.is_optional() {
                debug!("No candidate for optional claim {claim}; binding null");
                return Ok(ClaimProgress::Edge(Edge::Null));
            }
            return Err(PlaitError::Unresolvable {
                requested: claim.requested.clone(),
                tags: claim.tags.clone(),
                requester: requester.to_string(),
            });
        };

        if let Some(index) = self.plan.get_by_declaration(candidate.decl) {
            return Ok(ClaimProgress::Edge(self.edge_for(claim, candidate.access, index)));
        }
        if self.in_progress.contains(&candidate.decl) {
            let declaration = self.registry.declaration(candidate.decl).clone();
            let proxy = self.plan.ensure_proxy(candidate.decl, &declaration);
            debug!(
                "Cycle detected on {}; binding through proxy plan[{proxy}]",
                declaration.describe()
            );
            let edge = if claim.cardinality.is_promise() {
                Edge::Promise { target: proxy }
            } else {
                Edge::ProxyParam { placeholder: proxy }
            };
            return Ok(ClaimProgress::Edge(edge));
        }
        Ok(ClaimProgress::Descend(candidate.decl))
    }

    fn satisfy_collect(&mut self, claim: &Claim) -> Result<ClaimProgress> {
        let candidates = self.collect_candidates(&claim.requested, &claim.tags);
        for candidate in &candidates {
            if self.plan.get_by_declaration(candidate.decl).is_none()
                && !self.in_progress.contains(&candidate.decl)
            {
                return Ok(ClaimProgress::Descend(candidate.decl));
            }
        }

        // Element order follows registration order, never request order.
        let mut elements = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let element = match self.plan.get_by_declaration(candidate.decl) {
                Some(index) => self.element_edge(claim.cardinality, candidate.access, index),
                None => {
                    let declaration = self.registry.declaration(candidate.decl).clone();
                    let proxy = self.plan.ensure_proxy(candidate.decl, &declaration);
                    if claim.cardinality == Cardinality::CollectAllPromise {
                        Edge::Promise { target: proxy }
                    } else {
                        Edge::ProxyParam { placeholder: proxy }
                    }
                }
            };
            elements.push(element);
        }
        Ok(ClaimProgress::Edge(Edge::Collect { elements }))
    }

    /// Single-target candidate selection with the ambiguity rules: a lone
    /// eligible candidate wins; among several, a single DEFAULT-flagged one
    /// wins; anything else is a terminal ambiguity for this claim.
    fn select_single(&self, claim: &Claim, requester: &str) -> Result<Option<Candidate>> {
        let eligible = self.eligible_candidates(&claim.requested, &claim.tags);
        match eligible.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => {
                let defaults: Vec<Candidate> = many
                    .iter()
                    .copied()
                    .filter(|c| self.registry.declaration(c.decl).is_default())
                    .collect();
                if defaults.len() == 1 {
                    Ok(Some(defaults[0]))
                } else {
                    Err(PlaitError::Ambiguous {
                        requested: claim.requested.clone(),
                        tags: claim.tags.clone(),
                        candidates: many
                            .iter()
                            .map(|c| self.registry.declaration(c.decl).source.clone())
                            .collect(),
                        requester: requester.to_string(),
                    })
                }
            }
        }
    }

    /// Tiered candidate filter for single-target claims. Tagged claims
    /// prefer policy-matching tagged candidates and fall back to untagged
    /// ones (untagged matches any request); untagged claims prefer untagged
    /// candidates. Order within a tier is registration order.
    fn eligible_candidates(&self, token: &TypeToken, tags: &TagSet) -> Vec<Candidate> {
        let all = self.registry.get_by_type(token);
        let (tagged, untagged): (Vec<Candidate>, Vec<Candidate>) = all
            .iter()
            .copied()
            .partition(|c| !self.registry.declaration(c.decl).tags.is_empty());
        if tags.is_empty() {
            if untagged.is_empty() {
                tagged
            } else {
                untagged
            }
        } else {
            let matching: Vec<Candidate> = tagged
                .into_iter()
                .filter(|c| {
                    self.registry
                        .declaration(c.decl)
                        .tags
                        .satisfies(tags, self.policy)
                })
                .collect();
            if matching.is_empty() {
                untagged
            } else {
                matching
            }
        }
    }

    /// Collect-all takes every match instead of exactly one: all candidates
    /// for an untagged claim, policy-matching plus untagged candidates for a
    /// tagged claim.
    fn collect_candidates(&self, token: &TypeToken, tags: &TagSet) -> Vec<Candidate> {
        let all = self.registry.get_by_type(token);
        if tags.is_empty() {
            return all.to_vec();
        }
        all.iter()
            .copied()
            .filter(|c| {
                let declared = &self.registry.declaration(c.decl).tags;
                declared.is_empty() || declared.satisfies(tags, self.policy)
            })
            .collect()
    }

    /// Consults the extension provider for an unmatched concrete request.
    /// The attempt is speculative: registry, plan and progress markers are
    /// value-copied first and restored if the synthesized declaration's own
    /// subtree fails, so a discarded branch leaves no trace.
    fn try_synthesize(&mut self, claim: &Claim) -> Result<Option<usize>> {
        let Some(extension) = self.extension else {
            return Ok(None);
        };
        let key = (claim.requested.clone(), claim.tags.clone());
        if self.synth_in_flight.contains(&key) {
            return Err(PlaitError::CyclicTemplate {
                requested: claim.requested.clone(),
            });
        }
        let Some(synthesized) = extension.resolve(&claim.requested, &claim.tags) else {
            return Ok(None);
        };

        self.synth_in_flight.insert(key.clone());
        let registry_snapshot = self.registry.clone();
        let plan_snapshot = self.plan.clone();
        let in_progress_snapshot = self.in_progress.clone();

        let declaration = synthesized.into_declaration();
        debug!(
            "Extension synthesized {} for request {}",
            declaration.describe(),
            claim.requested
        );
        let decl_index = self.registry.add(declaration);
        let outcome = self.resolve_declaration(decl_index);
        self.synth_in_flight.remove(&key);

        match outcome {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                warn!(
                    "Discarding speculative synthesis for {}: {e}",
                    claim.requested
                );
                self.registry = registry_snapshot;
                self.plan = plan_snapshot;
                self.in_progress = in_progress_snapshot;
                Err(e)
            }
        }
    }

    fn edge_for(&self, claim: &Claim, access: Access, index: usize) -> Edge {
        match claim.cardinality {
            Cardinality::ExactlyOne | Cardinality::Optional => match access {
                Access::Direct => Edge::Direct { target: index },
                Access::Unwrap => Edge::Unwrap { target: index },
            },
            Cardinality::Lazy | Cardinality::OptionalLazy => Edge::Lazy { target: index },
            Cardinality::Promise | Cardinality::OptionalPromise => Edge::Promise { target: index },
            Cardinality::TokenOnly
            | Cardinality::CollectAll
            | Cardinality::CollectAllLazy
            | Cardinality::CollectAllPromise => {
                unreachable!("token and collect claims never reach edge_for")
            }
        }
    }

    fn element_edge(&self, cardinality: Cardinality, access: Access, index: usize) -> Edge {
        match cardinality {
            Cardinality::CollectAll => match access {
                Access::Direct => Edge::Direct { target: index },
                Access::Unwrap => Edge::Unwrap { target: index },
            },
            Cardinality::CollectAllLazy => Edge::Lazy { target: index },
            Cardinality::CollectAllPromise => Edge::Promise { target: index },
            _ => unreachable!("element_edge is only called for collect claims"),
        }
    }

    /// Post-pass over the finished plan: every component whose produced type
    /// equals an interceptor's target type gets wrapped, first-registered
    /// interceptor outermost. Interceptor failures go to `diagnostics`
    /// rather than breaking any root.
    fn apply_interceptors(&mut self) {
        let interceptor_decls = self.registry.interceptors();
        if interceptor_decls.is_empty() {
            return;
        }
        // Components resolved after the pass starts (the interceptors' own
        // dependency subtrees) are not themselves wrap targets.
        let wrap_limit = self.plan.len();

        for interceptor_decl in interceptor_decls {
            let declaration = self.registry.declaration(interceptor_decl).clone();
            let Some(target) = interceptor_target_type(&declaration) else {
                self.diagnostics.push(PlaitError::Resolution(format!(
                    "interceptor {} must produce {}<T>",
                    declaration.describe(),
                    containers::INTERCEPT
                )));
                continue;
            };

            let matches: Vec<usize> = self.plan.components()[..wrap_limit]
                .iter()
                .filter(|c| {
                    matches!(c.role, Role::Factory)
                        && c.produced == target
                        && c.declaration != interceptor_decl
                })
                .map(|c| c.index)
                .collect();
            if matches.is_empty() {
                debug!(
                    "Interceptor {} matches no resolved component; skipping",
                    declaration.describe()
                );
                continue;
            }

            let interceptor_index = match self.resolve_declaration(interceptor_decl) {
                Ok(index) => index,
                Err(e) => {
                    warn!(
                        "Failed to resolve interceptor {}: {e}",
                        declaration.describe()
                    );
                    self.diagnostics.push(e);
                    continue;
                }
            };
            for component in matches {
                debug!(
                    "Wrapping plan[{component}] with interceptor plan[{interceptor_index}]"
                );
                self.plan.add_wrapper(component, interceptor_index);
            }
        }
    }
}

fn interceptor_target_type(declaration: &Declaration) -> Option<TypeToken> {
    if declaration.produced.is_container(containers::INTERCEPT) {
        declaration.produced.inner().cloned()
    } else {
        None
    }
}
