// plait/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use plait_common::config::Config;
use plait_common::error::Result;

// Module declarations
pub mod check;
pub mod list;
pub mod resolve;

use crate::cli::check::CheckArgs;
use crate::cli::list::ListArgs;
use crate::cli::resolve::ResolveArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "plait", bin_name = "plait")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the instantiation plan for a manifest's root requests
    Resolve(ResolveArgs),
    /// Diagnose every broken declaration and root in one pass
    Check(CheckArgs),
    /// List the declarations in a manifest
    List(ListArgs),
}

impl Command {
    pub fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Resolve(command) => command.run(config),
            Self::Check(command) => command.run(config),
            Self::List(command) => command.run(config),
        }
    }
}
