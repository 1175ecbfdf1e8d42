//! ---
//! lab_section: "07-tooling"
//! lab_subsection: "binary"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Validate subcommand."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use topolab_parser::{parse_topology_with, ParserOptions};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Topology description file
    pub file: PathBuf,
    /// Node type assumed for declarations without a `type` attribute
    #[arg(long = "default-type")]
    pub default_type: Option<String>,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("unable to read {}", args.file.display()))?;
    let options = ParserOptions {
        default_node_type: args.default_type,
    };
    let topology = parse_topology_with(&text, &options)
        .with_context(|| format!("{} failed validation", args.file.display()))?;
    println!("{}: OK ({})", args.file.display(), topology);
    Ok(())
}
