use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Browse and edit a remote product catalog
#[derive(Debug, Parser)]
#[command(name = "catalog-viewer", version, about)]
pub struct Cli {
    /// Catalog service base URL [env: CATALOG_BASE_URL]
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory holding the persisted mirror [env: CATALOG_DATA_DIR]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Request timeout in seconds [env: CATALOG_TIMEOUT_SECS]
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Keep locally added products across refetches [env: CATALOG_KEEP_PENDING]
    #[arg(long, global = true)]
    pub keep_pending: bool,

    /// Keep the mirror in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Log filter [env: LOG_LEVEL]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Write daily log files here [env: LOG_DIR]
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Subcommand to run, `browse` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Browse)
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Interactive product grid (default)
    Browse,
    /// Print the catalog
    List,
    /// Add a product
    Add(AddArgs),
    /// Raise a product's price by 10
    BumpPrice {
        /// Product id
        id: u64,
    },
}

/// Raw add-product input, validated like the interactive form
#[derive(Debug, Clone, PartialEq, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub price: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub image: String,
    #[arg(long)]
    pub rating: String,
}
