//! Core enrichment logic for the municipality URI enricher.
//!
//! This crate ties together the SPARQL fetch, name normalization, reference
//! tables, and the identifier upsert into one batch job (`run_enrichment`).

pub mod merge;
pub mod normalize;
pub mod package;
pub mod pipeline;
pub mod table;
