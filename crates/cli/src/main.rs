//! Virtual catalog CLI - browse the catalog tree from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Resolve one path (absolute, or relative to the tree root)
//! vcat resolve Men/Coats/meskwielt
//!
//! # List the children of a category or product
//! vcat ls /var/commerce/products/catalog/Men
//!
//! # Page through the products of a category
//! vcat products Men/Coats --limit 50
//!
//! # Full-text product search
//! vcat search jacket --page 2 --page-size 10
//! ```
//!
//! Configuration is read from `CATALOG_*` environment variables (and `.env`).
//! Log output goes to stderr, is filtered with `RUST_LOG`, and is written as
//! JSON lines with `--log-json`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "vcat")]
#[command(author, version, about = "Browse a remote commerce catalog as a tree")]
struct Cli {
    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a path to a category, product, variant or image node
    Resolve {
        /// Tree path
        path: String,
    },
    /// List the children of a node
    Ls {
        /// Tree path
        path: String,
    },
    /// List the products of a category, fetching pages lazily
    Products {
        /// Category path
        path: String,

        /// Stop after this many products
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Full-text product search
    Search {
        /// Search text
        text: String,

        /// Page number (1-indexed)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Products per page
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "virtual_catalog=info".into());
    let json_layer = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let tree = commands::browse::open_tree()?;

    match cli.command {
        Commands::Resolve { path } => commands::browse::resolve(&tree, &path).await?,
        Commands::Ls { path } => commands::browse::list(&tree, &path).await?,
        Commands::Products { path, limit } => {
            commands::browse::products(&tree, &path, limit).await?;
        }
        Commands::Search {
            text,
            page,
            page_size,
        } => commands::browse::search(&tree, &text, page, page_size).await?,
    }
    Ok(())
}
