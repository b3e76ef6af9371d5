use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use federation_resolvability::ResolvabilityOptions;
use federation_resolvability::build_federated_graph;
use federation_resolvability::error::CompositionError;
use federation_resolvability::subgraph::SubgraphDefinition;
use federation_resolvability::validate_resolvability;
use tracing_subscriber::EnvFilter;

/// CLI arguments. See <https://docs.rs/clap/latest/clap/_derive/index.html>
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Checks that every field of the subgraphs can be resolved from a root field
    Validate {
        /// The path to a JSON array of subgraph definitions, or `-` for stdin
        subgraphs: PathBuf,
        /// Prints the diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Prints the resolvability graph of the subgraphs in GraphViz format
    Graph {
        /// The path to a JSON array of subgraph definitions, or `-` for stdin
        subgraphs: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Validate { subgraphs, json } => validate(&subgraphs, json),
        Command::Graph { subgraphs } => {
            let graph = build_federated_graph(&read_subgraphs(&subgraphs)?)?;
            println!("{}", graph.to_dot());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_subgraphs(input_path: &Path) -> anyhow::Result<Vec<SubgraphDefinition>> {
    let input = if input_path == Path::new("-") {
        io::read_to_string(io::stdin()).context("failed to read stdin")?
    } else {
        fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?
    };
    serde_json::from_str(&input).context("invalid subgraph definitions")
}

fn validate(input_path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let subgraphs = read_subgraphs(input_path)?;
    let graph = build_federated_graph(&subgraphs)?;
    let errors = match validate_resolvability(&graph, &ResolvabilityOptions::default())? {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&errors))?);
    } else {
        for error in &errors {
            println!("[{}] {}\n", error.code(), error.message());
        }
    }
    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn to_json(errors: &[CompositionError]) -> serde_json::Value {
    let errors = errors
        .iter()
        .map(|error| match error {
            CompositionError::UnresolvablePath(unresolvable) => serde_json::json!({
                "code": error.code(),
                "message": error.message(),
                "fieldName": unresolvable.field_name.as_str(),
                "typeName": unresolvable.type_name.as_str(),
                "path": unresolvable.path.to_string(),
                "reasons": unresolvable.reasons,
            }),
        })
        .collect::<Vec<_>>();
    serde_json::json!({ "errors": errors })
}
