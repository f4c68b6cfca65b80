//! user-props - Command Line Host
//!
//! Loads a property tree from disk and runs the engine over it.
//!
//! # Usage
//!
//! Evaluate a tree and print the outcome:
//! ```bash
//! user-props eval page.json --snapshot page.snapshot.json --write
//! ```
//!
//! Compile every snippet without running anything:
//! ```bash
//! user-props check page.json
//! ```
//!
//! Print the expression dependency graph:
//! ```bash
//! user-props graph page.json
//! ```
//!
//! Upgrade a legacy flat property map:
//! ```bash
//! user-props migrate legacy.json --output page.json
//! ```
//!
//! Tree files are export documents (`{"schemaVersion": 1, "tree": ...}`);
//! a bare tree object is accepted as well.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use user_props::{
    build_expression_dependency_graph,
    tree::{export_tree, import_tree, migrate_flat_map_to_tree, LegacyFlatMap},
    ImportError, PropTree, PropsConfig, PropsPipeline, Snapshot,
};

#[derive(Parser)]
#[command(name = "user-props")]
#[command(about = "Evaluate reactive user-property trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run expressions, validation and watchers over a tree
    Eval {
        /// Tree document
        tree: PathBuf,

        /// Engine config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Snapshot file read before the run and rewritten after it
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write the evaluated tree back to its file
        #[arg(long)]
        write: bool,
    },

    /// Compile every expression, custom rule and watcher
    Check {
        /// Tree document
        tree: PathBuf,

        /// Engine config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the expression dependency graph as JSON
    Graph {
        /// Tree document
        tree: PathBuf,
    },

    /// Convert a legacy flat property map into a tree document
    Migrate {
        /// Legacy map (JSON)
        input: PathBuf,

        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,user_props=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            tree,
            config,
            snapshot,
            write,
        } => eval(&tree, config.as_deref(), snapshot.as_deref(), write),
        Commands::Check { tree, config } => check(&tree, config.as_deref()),
        Commands::Graph { tree } => graph(&tree),
        Commands::Migrate { input, output } => migrate(&input, output.as_deref()),
    }
}

fn load_tree(path: &Path) -> Result<PropTree> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree file {:?}", path))?;

    match import_tree(&content) {
        Ok(tree) => Ok(tree),
        Err(ImportError::Unversioned) => {
            tracing::debug!("{:?} has no schemaVersion, reading it as a bare tree", path);
            let tree: PropTree = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse tree {:?}", path))?;
            tree.check_invariants()?;
            Ok(tree)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to import tree {:?}", path)),
    }
}

fn load_config(path: Option<&Path>) -> Result<PropsConfig> {
    Ok(match path {
        Some(path) => PropsConfig::load(path)?,
        None => PropsConfig::default(),
    })
}

fn eval(path: &Path, config: Option<&Path>, snapshot: Option<&Path>, write: bool) -> Result<()> {
    let config = load_config(config)?;
    let mut tree = load_tree(path)?;

    let previous: Option<Snapshot> = match snapshot {
        Some(file) if file.exists() => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read snapshot {:?}", file))?;
            Some(serde_json::from_str(&content).with_context(|| format!("Invalid snapshot {:?}", file))?)
        }
        _ => None,
    };

    let mut pipeline = PropsPipeline::new(config);
    let outcome = pipeline.evaluate_pipeline(&mut tree, previous.as_ref());
    tracing::info!(
        "Evaluated {:?} in {:.3} ms ({} changes)",
        path,
        outcome.metrics.took_ms,
        outcome.expr_changes.len()
    );

    if let Some(file) = snapshot {
        std::fs::write(file, serde_json::to_string_pretty(outcome.snapshot())?)
            .with_context(|| format!("Failed to write snapshot {:?}", file))?;
    }
    if write {
        std::fs::write(path, export_tree(&tree)?)
            .with_context(|| format!("Failed to write tree {:?}", path))?;
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn check(path: &Path, config: Option<&Path>) -> Result<()> {
    let tree = load_tree(path)?;
    let pipeline = PropsPipeline::new(load_config(config)?);
    let checked = pipeline.check_snippets(&tree)?;
    println!("{} snippets compile", checked);
    Ok(())
}

fn graph(path: &Path) -> Result<()> {
    let tree = load_tree(path)?;
    let graph = build_expression_dependency_graph(&tree);
    if graph.has_cycle {
        tracing::warn!("Cycle between {:?}", graph.cyclic_nodes());
    }
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

fn migrate(input: &Path, output: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read legacy map {:?}", input))?;
    let map: LegacyFlatMap =
        serde_json::from_str(&content).with_context(|| format!("Invalid legacy map {:?}", input))?;

    let tree = migrate_flat_map_to_tree(&map);
    let document = export_tree(&tree)?;
    tracing::info!("Migrated {} legacy entries", map.len());

    match output {
        Some(file) => std::fs::write(file, document)
            .with_context(|| format!("Failed to write tree {:?}", file))?,
        None => println!("{}", document),
    }
    Ok(())
}
