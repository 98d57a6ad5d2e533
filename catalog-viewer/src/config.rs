use crate::cli::Cli;
use crate::mirror::ReconcilePolicy;
use catalog_client::ClientConfig;
use catalog_client::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use std::path::PathBuf;

/// Viewer configuration
///
/// # Environment variables
///
/// Every setting can come from the environment (or a `.env` file) and be
/// overridden on the command line:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | CATALOG_BASE_URL | https://fakestoreapi.com/ | catalog service |
/// | CATALOG_DATA_DIR | ./catalog-data | durable store directory |
/// | CATALOG_TIMEOUT_SECS | 30 | request timeout |
/// | CATALOG_KEEP_PENDING | false | keep local additions across refetches |
/// | LOG_LEVEL | info | log filter |
/// | LOG_DIR | (unset) | daily log files directory |
///
/// # Example
///
/// ```ignore
/// CATALOG_BASE_URL=http://localhost:3000 catalog-viewer list
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Catalog service base URL
    pub base_url: String,
    /// Where the product mirror is persisted
    pub data_dir: PathBuf,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Keep id-less local additions until the service reports them
    pub keep_pending: bool,
    /// Log filter, e.g. `info` or `catalog_viewer=debug`
    pub log_level: String,
    /// Daily rolling log files go here when set
    pub log_dir: Option<PathBuf>,
    /// Keep the mirror in memory only
    pub ephemeral: bool,
}

impl Config {
    /// Load from environment variables, with defaults for unset ones
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup("CATALOG_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            data_dir: lookup("CATALOG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./catalog-data")),
            timeout_secs: lookup("CATALOG_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            keep_pending: lookup("CATALOG_KEEP_PENDING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
            ephemeral: false,
        }
    }

    /// Apply command line overrides
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(data_dir) = &cli.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(timeout) = cli.timeout {
            self.timeout_secs = timeout;
        }
        if cli.keep_pending {
            self.keep_pending = true;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
        if let Some(dir) = &cli.log_dir {
            self.log_dir = Some(dir.clone());
        }
        self.ephemeral |= cli.ephemeral;
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone()).with_timeout(self.timeout_secs)
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        if self.keep_pending {
            ReconcilePolicy::KeepPending
        } else {
            ReconcilePolicy::Replace
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
