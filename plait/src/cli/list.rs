use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use plait_common::config::Config;
use plait_common::error::Result;
use plait_common::manifest;
use plait_common::model::declaration::Declaration;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to the declaration manifest
    pub manifest: PathBuf,

    /// Include template declarations
    #[arg(long)]
    pub templates: bool,
}

impl ListArgs {
    pub fn run(&self, _config: &Config) -> Result<()> {
        let manifest = manifest::load_manifest(&self.manifest)?;

        if manifest.declarations.is_empty() && manifest.templates.is_empty() {
            println!("{}", "0 declarations in manifest".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Kind").style_spec("b"),
            Cell::new("Produces").style_spec("b"),
            Cell::new("Tags").style_spec("b"),
            Cell::new("Params").style_spec("b"),
            Cell::new("Source").style_spec("b"),
        ]));

        for declaration in &manifest.declarations {
            add_declaration_row(&mut table, declaration, "component");
        }
        if self.templates {
            for template in &manifest.templates {
                add_declaration_row(&mut table, template, "template");
            }
        }
        table.printstd();

        println!(
            "{} declaration(s), {} template(s)",
            manifest.declarations.len().to_string().bold(),
            manifest.templates.len().to_string().bold()
        );
        Ok(())
    }
}

fn add_declaration_row(table: &mut Table, declaration: &Declaration, kind: &str) {
    let mut notes: Vec<&str> = Vec::new();
    if declaration.is_default() {
        notes.push("default");
    }
    if declaration.is_interceptor() {
        notes.push("interceptor");
    }
    let kind_cell = if notes.is_empty() {
        kind.to_string()
    } else {
        format!("{kind} ({})", notes.join(", "))
    };
    table.add_row(Row::new(vec![
        Cell::new(&kind_cell).style_spec("Fg"),
        Cell::new(&declaration.produced.to_string()).style_spec("Fb"),
        Cell::new(&declaration.tags.to_string()),
        Cell::new(&declaration.params.len().to_string()),
        Cell::new(&declaration.source),
    ]));
}
