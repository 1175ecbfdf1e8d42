//! ---
//! lab_section: "07-tooling"
//! lab_subsection: "binary"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Command line utility for topology descriptions."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Parser, Subcommand};
use topolab_common::logging;

mod inspect;
mod validate;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Topolab topology description utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Check a description for syntax and reference errors")]
    Validate(validate::ValidateArgs),
    #[command(about = "Parse a description and print the resolved graph")]
    Inspect(inspect::InspectArgs),
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => validate::run(args),
        Commands::Inspect(args) => inspect::run(args),
    }
}
