use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use plait_common::config::Config;
use plait_common::error::{PlaitError, Result};
use plait_common::manifest::{self, Manifest};
use plait_common::model::edge::Edge;
use plait_core::claims;
use plait_core::plan::{Component, Role};
use plait_core::registry::Registry;
use plait_core::resolve::{Resolution, Resolver};
use plait_core::TemplateLibrary;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Path to the declaration manifest
    pub manifest: PathBuf,

    /// Emit the resolved plan as JSON for the emission back end
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(&self, config: &Config) -> Result<()> {
        let manifest = manifest::load_manifest(&self.manifest)?;
        let resolution = run_resolution(&manifest, config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&resolution.document())?);
        } else {
            print_plan(&resolution);
        }

        if resolution.is_success() {
            Ok(())
        } else {
            Err(PlaitError::Resolution(format!(
                "{} of {} root request(s) failed to resolve",
                resolution.failed_roots().count(),
                resolution.roots.len()
            )))
        }
    }
}

/// Builds a registry and template library from a manifest and resolves its
/// root requests. Shared between `resolve` and `check`.
pub(crate) fn run_resolution(manifest: &Manifest, config: &Config) -> Result<Resolution> {
    let mut registry = Registry::new(config);
    for declaration in &manifest.declarations {
        registry.add(declaration.clone());
    }
    for template in &manifest.templates {
        registry.add_template(template.clone());
    }

    let mut roots = Vec::with_capacity(manifest.roots.len());
    for root in &manifest.roots {
        roots.push(claims::parse_root(&root.type_repr, root.tags.clone())?);
    }

    let templates = TemplateLibrary::new(registry.templates().to_vec(), config.tag_policy);
    let resolver = Resolver::new(registry, config.tag_policy).with_extension(&templates);
    Ok(resolver.resolve_roots(&roots))
}

fn print_plan(resolution: &Resolution) {
    if resolution.plan.is_empty() {
        println!("{}", "0 components resolved".yellow());
    } else {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Index").style_spec("b"),
            Cell::new("Component").style_spec("b"),
            Cell::new("Tags").style_spec("b"),
            Cell::new("Role").style_spec("b"),
            Cell::new("Edges").style_spec("b"),
        ]));
        for component in resolution.plan.components() {
            let role = match &component.role {
                Role::Factory => "factory".to_string(),
                Role::Proxy { target: Some(t) } => format!("proxy -> #{t}"),
                Role::Proxy { target: None } => "proxy".to_string(),
            };
            table.add_row(Row::new(vec![
                Cell::new(&component.index.to_string()),
                Cell::new(&component.produced.to_string()).style_spec("Fb"),
                Cell::new(&component.tags.to_string()),
                Cell::new(&role),
                Cell::new(&describe_edges(component)),
            ]));
        }
        table.printstd();
    }

    for outcome in &resolution.roots {
        match &outcome.result {
            Ok(_) => println!("{} {}", "✔".green(), outcome.claim),
            Err(e) => println!("{} {}: {}", "✘".red(), outcome.claim, e),
        }
    }
    for diagnostic in &resolution.diagnostics {
        println!("{} {}", "✘".red(), diagnostic);
    }
}

fn describe_edges(component: &Component) -> String {
    component
        .edges
        .iter()
        .map(edge_brief)
        .collect::<Vec<_>>()
        .join(", ")
}

fn edge_brief(edge: &Edge) -> String {
    match edge {
        Edge::Direct { target } => format!("#{target}"),
        Edge::Unwrap { target } => format!("unwrap #{target}"),
        Edge::Lazy { target } => format!("lazy #{target}"),
        Edge::Promise { target } => format!("promise #{target}"),
        Edge::Collect { elements } => format!(
            "[{}]",
            elements.iter().map(edge_brief).collect::<Vec<_>>().join(", ")
        ),
        Edge::TokenLiteral { token } => format!("token {token}"),
        Edge::Null => "null".to_string(),
        Edge::ProxyParam { placeholder } => format!("proxy #{placeholder}"),
    }
}
