//! Pluggable on-demand declaration synthesis. When no registered
//! declaration satisfies a concrete requested type, the resolver consults an
//! [`Extension`]; a returned declaration is registered and resolved exactly
//! like any discovered one. Calls must be synchronous and side-effect-free
//! beyond the declaration they return, because the resolver may discard a
//! speculative branch built from the answer.

use std::collections::HashMap;

use plait_common::model::declaration::{DeclFlags, Declaration, RawParameter};
use plait_common::model::tags::{TagMatchPolicy, TagSet};
use plait_common::model::token::TypeToken;
use tracing::debug;

/// A declaration synthesized for one concrete request. The parameters
/// re-enter the normal claim-parsing and resolution recursion.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub produced: TypeToken,
    pub tags: TagSet,
    pub provides: Vec<TypeToken>,
    pub params: Vec<RawParameter>,
    pub source: String,
}

impl Synthesized {
    pub fn into_declaration(self) -> Declaration {
        Declaration {
            produced: self.produced,
            tags: self.tags,
            provides: self.provides,
            type_params: Vec::new(),
            params: self.params,
            source: self.source,
            flags: DeclFlags::empty(),
        }
    }
}

pub trait Extension {
    fn resolve(&self, requested: &TypeToken, tags: &TagSet) -> Option<Synthesized>;
}

/// Specializes template declarations against concrete requests. A template's
/// produced type (or one of its provided supertypes) is unified with the
/// requested token, binding the template's type variables; the bindings are
/// then substituted through the produced type, the supertypes and every
/// parameter type. Templates are tried in the order they were declared; the
/// first full match wins.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Declaration>,
    policy: TagMatchPolicy,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<Declaration>, policy: TagMatchPolicy) -> Self {
        Self { templates, policy }
    }

    fn tags_admit(&self, template: &Declaration, requested: &TagSet) -> bool {
        if requested.is_empty() {
            return template.tags.is_empty();
        }
        template.tags.is_empty() || template.tags.satisfies(requested, self.policy)
    }
}

impl Extension for TemplateLibrary {
    fn resolve(&self, requested: &TypeToken, tags: &TagSet) -> Option<Synthesized> {
        for template in &self.templates {
            if !self.tags_admit(template, tags) {
                continue;
            }
            let Some(bindings) = match_template(template, requested) else {
                continue;
            };
            debug!(
                "Specializing template {} for {} with {} binding(s)",
                template.describe(),
                requested,
                bindings.len()
            );

            let params = template
                .params
                .iter()
                .map(|p| substitute_parameter(p, &bindings))
                .collect();
            let synthesized = Synthesized {
                produced: substitute(&template.produced, &bindings),
                tags: if template.tags.is_empty() {
                    tags.clone()
                } else {
                    template.tags.clone()
                },
                provides: template
                    .provides
                    .iter()
                    .map(|t| substitute(t, &bindings))
                    .collect(),
                params,
                source: template.source.clone(),
            };
            return Some(synthesized);
        }
        None
    }
}

type Bindings = HashMap<String, TypeToken>;

/// Unifies the template's produced pattern (or a provided supertype
/// pattern) with the request. Every type variable must end up bound, so the
/// specialized declaration is fully concrete.
fn match_template(template: &Declaration, requested: &TypeToken) -> Option<Bindings> {
    let mut patterns = Vec::with_capacity(1 + template.provides.len());
    patterns.push(&template.produced);
    patterns.extend(template.provides.iter());

    for pattern in patterns {
        let mut bindings = Bindings::new();
        if unify(pattern, requested, &template.type_params, &mut bindings)
            && template.type_params.iter().all(|v| bindings.contains_key(v))
        {
            return Some(bindings);
        }
    }
    None
}

fn unify(
    pattern: &TypeToken,
    concrete: &TypeToken,
    variables: &[String],
    bindings: &mut Bindings,
) -> bool {
    if pattern.args.is_empty() && variables.contains(&pattern.raw) {
        return match bindings.get(&pattern.raw) {
            Some(bound) => bound == concrete,
            None => {
                bindings.insert(pattern.raw.clone(), concrete.clone());
                true
            }
        };
    }
    pattern.raw == concrete.raw
        && pattern.args.len() == concrete.args.len()
        && pattern
            .args
            .iter()
            .zip(concrete.args.iter())
            .all(|(p, c)| unify(p, c, variables, bindings))
}

fn substitute(token: &TypeToken, bindings: &Bindings) -> TypeToken {
    if token.args.is_empty() {
        if let Some(bound) = bindings.get(&token.raw) {
            return bound.clone();
        }
    }
    TypeToken {
        raw: token.raw.clone(),
        args: token.args.iter().map(|a| substitute(a, bindings)).collect(),
    }
}

fn substitute_parameter(param: &RawParameter, bindings: &Bindings) -> RawParameter {
    let type_repr = param.type_repr.as_deref().and_then(|text| {
        // A parameter the front end could not type stays untyped; the claim
        // parser reports it against the specialized declaration.
        TypeToken::parse(text)
            .ok()
            .map(|t| substitute(&t, bindings).to_string())
    });
    RawParameter {
        name: param.name.clone(),
        type_repr,
        tags: param.tags.clone(),
        nullable: param.nullable,
    }
}
