mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use anyhow::Context;
use bookfinder::{Services, Settings};
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::FilterArgs;

#[derive(Parser)]
#[command(name = "bookfinder")]
#[command(about = "Semantic book search with diversity-aware retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Semantic search, then filter the retrieved books
    Search {
        query: String,
        #[arg(long, short, default_value_t = 10, help = "Number of results")]
        limit: usize,
        #[arg(long, help = "Candidate pool multiplier for diversity re-ranking")]
        fetch_multiplier: Option<usize>,
        #[arg(long, help = "Plain nearest-neighbor search (no diversity re-ranking)")]
        similarity: bool,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Filter the full dataset without semantic search
    Browse {
        #[arg(long, short, default_value_t = 20, help = "Number of books to display")]
        limit: usize,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show categories, publishers and price/year bounds of the dataset
    Facets {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Embed the dataset into the vector index
    Index {
        #[arg(long, help = "Clear the index first")]
        rebuild: bool,
        #[arg(long, help = "Fraction of described books to index (0, 1]")]
        sample_fraction: Option<f64>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Check index connectivity and counts
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server over stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "bookfinder=debug" } else { "bookfinder=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    #[cfg(feature = "mcp")]
    if let Commands::Mcp { install: true } = cli.command {
        mcp::print_install_instructions();
        return Ok(());
    }

    let settings = Settings::from_env().context("reading configuration")?;
    let services = Arc::new(Services::init(settings).context("initializing services")?);

    let result = match cli.command {
        Commands::Search {
            query,
            limit,
            fetch_multiplier,
            similarity,
            filters,
            json,
        } => commands::search::run(
            &services,
            &query,
            limit,
            fetch_multiplier,
            similarity,
            filters.into_criteria(),
            json,
        ),
        Commands::Browse {
            limit,
            filters,
            json,
        } => commands::browse::run(&services, limit, filters.into_criteria(), json),
        Commands::Facets { json } => commands::browse::facets(&services, json),
        Commands::Index {
            rebuild,
            sample_fraction,
            json,
        } => commands::index::run(&services, rebuild, sample_fraction, json),
        Commands::Status { json } => commands::status::run(&services, json),

        #[cfg(feature = "mcp")]
        Commands::Mcp { .. } => run_mcp_server(Arc::clone(&services)),
    };

    if let Err(e) = services.shutdown() {
        tracing::warn!(error = %e, "shutdown failed");
    }
    result
}

#[cfg(feature = "mcp")]
fn run_mcp_server(services: Arc<Services>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mcp::run_mcp_server(services))
}
