//! Declaration registry: every known concrete declaration, indexed under
//! each type token it structurally satisfies.

use std::collections::HashMap;

use plait_common::config::Config;
use plait_common::model::declaration::Declaration;
use plait_common::model::token::TypeToken;
use tracing::debug;

/// How a candidate satisfies the token it was indexed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The declaration produces (or provides) the token itself.
    Direct,
    /// The declaration produces a wrapper container around the token; the
    /// value must be unwrapped before use.
    Unwrap,
}

/// A declaration index paired with the access path it was indexed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub decl: usize,
    pub access: Access,
}

/// Per-run declaration store. Insertion order is preserved everywhere so
/// candidate lists and tie-breaks are deterministic. The registry is `Clone`
/// so speculative resolution branches can value-copy it and discard the copy
/// on failure.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    declarations: Vec<Declaration>,
    by_type: HashMap<TypeToken, Vec<Candidate>>,
    templates: Vec<Declaration>,
    wrapper_containers: Vec<String>,
}

impl Registry {
    pub fn new(config: &Config) -> Self {
        Self {
            declarations: Vec::new(),
            by_type: HashMap::new(),
            templates: Vec::new(),
            wrapper_containers: config.wrapper_containers.clone(),
        }
    }

    /// Registers a concrete declaration and indexes it under every token it
    /// structurally satisfies: the produced type, each declared supertype,
    /// and the unwrapped form of a wrapper-container produced type. Returns
    /// the declaration's stable index. This step cannot fail; bad claims
    /// surface later, during resolution.
    ///
    /// Panics if handed a template declaration. Templates are never matched
    /// directly and belong in [`Registry::add_template`].
    pub fn add(&mut self, declaration: Declaration) -> usize {
        assert!(
            !declaration.is_template(),
            "template declaration {} cannot be registered for direct matching",
            declaration.describe()
        );

        let index = self.declarations.len();
        let mut satisfied: Vec<(TypeToken, Access)> = Vec::new();
        satisfied.push((declaration.produced.clone(), Access::Direct));
        for provided in &declaration.provides {
            satisfied.push((provided.clone(), Access::Direct));
        }
        if self.is_wrapper_container(&declaration.produced.raw) {
            if let Some(inner) = declaration.produced.inner() {
                satisfied.push((inner.clone(), Access::Unwrap));
            }
        }

        let mut seen: Vec<&TypeToken> = Vec::new();
        for (token, access) in &satisfied {
            if seen.contains(&token) {
                continue;
            }
            seen.push(token);
            self.by_type
                .entry(token.clone())
                .or_default()
                .push(Candidate {
                    decl: index,
                    access: *access,
                });
        }
        debug!(
            "Registered declaration #{index} {} under {} token(s)",
            declaration.describe(),
            satisfied.len()
        );

        self.declarations.push(declaration);
        index
    }

    /// Stores a template declaration in the side list consulted by template
    /// specialization. Never indexed for direct matching.
    pub fn add_template(&mut self, declaration: Declaration) {
        assert!(
            declaration.is_template(),
            "declaration {} has no type variables and must be registered with add()",
            declaration.describe()
        );
        debug!("Stored template declaration {}", declaration.describe());
        self.templates.push(declaration);
    }

    /// All candidates registered under a token, in first-registered order.
    pub fn get_by_type(&self, token: &TypeToken) -> &[Candidate] {
        self.by_type.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of declarations flagged as interceptors, registration order.
    pub fn interceptors(&self) -> Vec<usize> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_interceptor())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn declaration(&self, index: usize) -> &Declaration {
        &self.declarations[index]
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn templates(&self) -> &[Declaration] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    fn is_wrapper_container(&self, raw: &str) -> bool {
        self.wrapper_containers.iter().any(|w| w == raw)
    }
}
