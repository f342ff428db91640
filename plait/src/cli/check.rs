use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use plait_common::config::Config;
use plait_common::error::{PlaitError, Result};
use plait_common::manifest;
use plait_core::claims;

use crate::cli::resolve::run_resolution;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the declaration manifest
    pub manifest: PathBuf,
}

impl CheckArgs {
    pub fn run(&self, config: &Config) -> Result<()> {
        let manifest = manifest::load_manifest(&self.manifest)?;

        // Claim-parse every declaration up front so broken parameters are
        // reported even when no root request reaches them.
        let mut problems: Vec<String> = Vec::new();
        for declaration in manifest.declarations.iter().chain(&manifest.templates) {
            if let Err(e) = claims::parse_declaration_claims(declaration) {
                problems.push(e.to_string());
            }
        }

        let resolution = run_resolution(&manifest, config)?;
        problems.extend(resolution.failure_lines());

        if problems.is_empty() {
            println!(
                "{} {} component(s) planned, {} root request(s) resolve cleanly",
                "✔".green(),
                resolution.plan.len(),
                resolution.roots.len()
            );
            Ok(())
        } else {
            for problem in &problems {
                println!("{} {}", "✘".red(), problem);
            }
            Err(PlaitError::Resolution(format!(
                "{} problem(s) found",
                problems.len()
            )))
        }
    }
}
