//! Catalog Viewer - terminal front end for the remote product catalog
//!
//! Mirrors the remote catalog into durable local storage, renders it as a
//! grid, and lets the user add products or raise prices. The same view model
//! backs the interactive browser and the headless commands.

pub mod cli;
pub mod config;
pub mod form;
pub mod logger;
pub mod mirror;
pub mod shell;
pub mod store;
pub mod tui;
pub mod view;

pub use cli::{AddArgs, Cli, Command};
pub use config::Config;
pub use form::{AddProductForm, FormError, FormField};
pub use logger::{LogTarget, init_logger};
pub use mirror::{MirrorStore, ReconcilePolicy};
pub use shell::{AppShell, Shell};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
pub use view::{CatalogView, ProductCard, Screen, ViewPhase};
