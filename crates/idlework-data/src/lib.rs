//! Catalog loading for idlework games.
//!
//! Reads resource and structure catalogs (RON, TOML or JSON, detected by
//! extension) and an optional `economy.toml` balance file from a data
//! directory. Entries are handed to the core loosely typed; the core
//! validates each one and skips the bad ones.

pub mod loader;

pub use loader::{Catalog, DataLoadError, load_catalog};
