//! Loads a declaration manifest: the discovery front end's output, reduced
//! to a JSON document of raw factory declarations plus consumer root
//! requests.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{PlaitError, Result};
use crate::model::declaration::{DeclFlags, Declaration, RawParameter};
use crate::model::tags::TagSet;
use crate::model::token::TypeToken;

/// A consumer root request. The requested type stays textual here; the
/// claim parser classifies it exactly like a factory parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRequest {
    pub type_repr: String,
    pub tags: TagSet,
}

/// A parsed manifest: concrete declarations, template declarations (split
/// out because they are never matched directly), and root requests.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub declarations: Vec<Declaration>,
    pub templates: Vec<Declaration>,
    pub roots: Vec<RootRequest>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    declarations: Vec<RawDeclaration>,
    #[serde(default)]
    roots: Vec<RawRoot>,
}

#[derive(Debug, Deserialize)]
struct RawDeclaration {
    produces: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    provides: Vec<String>,
    #[serde(default)]
    type_params: Vec<String>,
    #[serde(default)]
    params: Vec<RawManifestParam>,
    source: String,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    interceptor: bool,
}

#[derive(Debug, Deserialize)]
struct RawManifestParam {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    type_repr: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    nullable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRoot {
    Bare(String),
    Full {
        #[serde(rename = "type")]
        type_repr: String,
        #[serde(default)]
        tags: Vec<String>,
    },
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    debug!("Loading declaration manifest from {}", path.display());
    let raw_data = fs::read_to_string(path)?;
    parse_manifest(&raw_data)
}

pub fn parse_manifest(raw_data: &str) -> Result<Manifest> {
    let raw: RawManifest = serde_json::from_str(raw_data)?;

    let mut manifest = Manifest::default();
    for raw_decl in raw.declarations {
        let decl = convert_declaration(raw_decl)?;
        if decl.is_template() {
            manifest.templates.push(decl);
        } else {
            manifest.declarations.push(decl);
        }
    }
    for raw_root in raw.roots {
        manifest.roots.push(match raw_root {
            RawRoot::Bare(type_repr) => RootRequest {
                type_repr,
                tags: TagSet::new(),
            },
            RawRoot::Full { type_repr, tags } => RootRequest {
                type_repr,
                tags: tags.into_iter().collect(),
            },
        });
    }

    debug!(
        "Parsed {} declarations, {} templates, {} roots.",
        manifest.declarations.len(),
        manifest.templates.len(),
        manifest.roots.len()
    );
    Ok(manifest)
}

fn convert_declaration(raw: RawDeclaration) -> Result<Declaration> {
    let source = raw.source;
    let produced = TypeToken::parse(&raw.produces).map_err(|e| {
        PlaitError::Manifest(format!("bad produced type in {source}: {e}"))
    })?;

    let mut provides = Vec::with_capacity(raw.provides.len());
    for text in &raw.provides {
        provides.push(TypeToken::parse(text).map_err(|e| {
            PlaitError::Manifest(format!("bad provided type in {source}: {e}"))
        })?);
    }

    let params = raw
        .params
        .into_iter()
        .enumerate()
        .map(|(position, p)| RawParameter {
            name: p.name.unwrap_or_else(|| format!("arg{position}")),
            type_repr: p.type_repr,
            tags: p.tags.into_iter().collect(),
            nullable: p.nullable,
        })
        .collect();

    let mut flags = DeclFlags::empty();
    if raw.default {
        flags |= DeclFlags::DEFAULT;
    }
    if raw.interceptor {
        flags |= DeclFlags::INTERCEPTOR;
    }

    Ok(Declaration {
        produced,
        tags: raw.tags.into_iter().collect(),
        provides,
        type_params: raw.type_params,
        params,
        source,
        flags,
    })
}
