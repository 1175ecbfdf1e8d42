//! ---
//! lab_section: "07-tooling"
//! lab_subsection: "binary"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Inspect subcommand."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use topolab_parser::{parse_topology_with, ParserOptions, Topology};

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Topology description file
    pub file: PathBuf,
    /// Node type assumed for declarations without a `type` attribute
    #[arg(long = "default-type")]
    pub default_type: Option<String>,
    /// Emit the graph as JSON instead of the human-readable listing
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("unable to read {}", args.file.display()))?;
    let options = ParserOptions {
        default_node_type: args.default_type,
    };
    let topology = parse_topology_with(&text, &options)
        .with_context(|| format!("{} failed to parse", args.file.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&topology)?);
    } else {
        print_listing(&topology);
    }
    Ok(())
}

fn print_listing(topology: &Topology) {
    println!("nodes:");
    for node in topology.nodes.values() {
        let attributes = node
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} [{attributes}]", node.identifier);
        for port in &node.ports {
            println!("    port {port}");
        }
    }
    println!("links:");
    for link in &topology.links {
        println!("  {}", link.label());
    }
}
