//! Shared types, error model, and configuration for the municipality URI enricher.
//!
//! This crate is the foundation depended on by all other muniuri crates.
//! It provides:
//! - [`MuniUriError`] — the unified error type
//! - Domain types ([`MunicipalityRecord`], [`MunicipalityTable`], [`StateLookup`],
//!   [`FetchedIdentifier`], [`UriType`])
//! - Configuration ([`AppConfig`], [`SourceConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, HttpConfig, PackageConfig, SourceConfig, load_config,
    load_config_from, write_default_config,
};
pub use error::{MuniUriError, Result};
pub use types::{
    FetchedIdentifier, FetchedRow, IDENTIFIER_COLUMNS, MunicipalityRecord, MunicipalityTable,
    StateLookup, UriType,
};
