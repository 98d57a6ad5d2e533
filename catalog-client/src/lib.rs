//! Catalog Client - HTTP client for the remote product catalog
//!
//! Provides the three catalog operations (list, create, replace) on top of a
//! pluggable HTTP transport, with a tag-invalidated query cache so that any
//! mutation forces the next read back to the network.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "in-memory"))]
pub mod memory;

pub use api::CatalogApi;
pub use cache::{CacheTag, QueryCache};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, NetworkHttpClient};
#[cfg(any(test, feature = "in-memory"))]
pub use memory::{InMemoryHttpClient, RecordedRequest};

// Re-export shared types for convenience
pub use shared::{NewProduct, Product, ProductRecord, ProductUpdate, Rating};
