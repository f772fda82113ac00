//! muniuri CLI — enrich the municipality table with DBpedia identifiers.
//!
//! Queries the configured SPARQL endpoints, matches the results against the
//! canonical municipality table, and writes new URIs back in place.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
