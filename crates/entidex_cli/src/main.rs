//! EntiDex CLI
//!
//! Command-line tools for EntiDex reindexing mappings.
//!
//! # Commands
//!
//! - `check` - Validate a mapping file and summarize its resolvers
//! - `explain` - Print compiled resolver trees
//! - `resolve` - List the entities to reindex after a change in an object graph

mod commands;
mod files;

use clap::{Parser, Subcommand};
use commands::resolve::ResolveRequest;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EntiDex command-line mapping tools.
#[derive(Parser)]
#[command(name = "entidex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the mapping file (types and declarations)
    #[arg(global = true, short, long)]
    mapping: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the mapping and summarize its resolvers
    Check {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print compiled resolver trees
    Explain {
        /// Concrete entity type to explain (default: all)
        #[arg(short, long = "type")]
        type_name: Option<String>,

        /// Build trees without dirtiness filters
        #[arg(long)]
        no_filters: bool,
    },

    /// List the entities to reindex after a change
    Resolve {
        /// Path to the object graph file
        #[arg(short, long)]
        graph: PathBuf,

        /// Id of the changed object
        #[arg(short, long)]
        object: u64,

        /// Changed property paths (default: unknown)
        #[arg(short, long, value_delimiter = ',')]
        dirty: Vec<String>,

        /// The object was deleted
        #[arg(long)]
        delete: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Check { format } => {
            let mapping = cli.mapping.ok_or("Mapping path required for check")?;
            commands::check::run(&mapping, &format)?;
        }
        Commands::Explain {
            type_name,
            no_filters,
        } => {
            let mapping = cli.mapping.ok_or("Mapping path required for explain")?;
            commands::explain::run(&mapping, type_name.as_deref(), no_filters)?;
        }
        Commands::Resolve {
            graph,
            object,
            dirty,
            delete,
            format,
        } => {
            let mapping = cli.mapping.ok_or("Mapping path required for resolve")?;
            let request = ResolveRequest {
                object,
                dirty,
                delete,
            };
            commands::resolve::run(&mapping, &graph, &request, &format)?;
        }
        Commands::Version => {
            println!("EntiDex CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EntiDex Core v{}", entidex_core::VERSION);
        }
    }

    Ok(())
}
