//! Grove CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "grove")]
#[command(version, about = "Dependency and call graphs for multi-language source trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Cache directory (overrides .grove.toml and GROVE_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project and print a summary
    Scan {
        /// Ignore cached results
        #[arg(short, long)]
        force: bool,
    },
    /// Print the file or function graph as JSON
    Graph {
        #[arg(short, long, value_enum, default_value_t = GraphKind::File)]
        kind: GraphKind,
    },
    /// Print one file's structure and resolved neighbours
    File {
        /// Path relative to the project root
        path: String,
    },
    /// Report import cycles and unused files and functions
    Analyze,
    /// Print project statistics
    Stats {
        /// Report cache usage instead
        #[arg(long)]
        cache: bool,
    },
    /// Concatenate the project's text files into one document
    Bundle {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use `----- path -----` separators instead of BA/WA borders
        #[arg(long)]
        plain: bool,
    },
    /// List the project's folders and files
    Names {
        /// List folders only
        #[arg(long)]
        no_files: bool,

        /// Include sizes in bytes and human-readable form
        #[arg(long)]
        sizes: bool,

        /// Print `path; [TYPE]` lines instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Clear the cache
    Clear {
        /// Clear every project's cache, not just this one
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GraphKind {
    File,
    Function,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "grove={0},grove_core={0},grove_indexer={0}",
            log_level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Grove v{}", env!("CARGO_PKG_VERSION"));

    let ctx = commands::Context::open(&cli.root, cli.cache_dir.as_deref())?;
    tracing::info!("Project root: {}", ctx.root().display());

    match cli.command {
        Commands::Scan { force } => commands::scan(&ctx, force).await,
        Commands::Graph { kind } => commands::graph(&ctx, kind).await,
        Commands::File { path } => commands::file(&ctx, &path).await,
        Commands::Analyze => commands::analyze(&ctx).await,
        Commands::Stats { cache } => commands::stats(&ctx, cache).await,
        Commands::Bundle { output, plain } => commands::bundle(&ctx, output, plain),
        Commands::Names {
            no_files,
            sizes,
            text,
        } => commands::names(&ctx, !no_files, sizes, text),
        Commands::Clear { all } => commands::clear(&ctx, all),
    }
}
