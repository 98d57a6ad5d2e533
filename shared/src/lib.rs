//! Shared types for the catalog workspace
//!
//! Product models exchanged between the catalog client and the viewer.
//! Both crates speak these types on the wire and in the local mirror.

pub mod models;

// Re-exports
pub use models::{NewProduct, Product, ProductRecord, ProductUpdate, Rating};
pub use serde::{Deserialize, Serialize};
