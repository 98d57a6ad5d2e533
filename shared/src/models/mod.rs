//! Catalog models

pub mod product;

pub use product::{NewProduct, Product, ProductRecord, ProductUpdate, Rating};
