//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use muniuri_core::pipeline::{EnrichConfig, EnrichResult, ProgressReporter};
use muniuri_shared::{AppConfig, CONFIG_FILE_NAME, UriType, load_config, write_default_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// muniuri — keep municipality DBpedia URIs up to date.
#[derive(Parser)]
#[command(
    name = "muniuri",
    version,
    about = "Fetch DBpedia URIs for municipalities and upsert them into the municipality table.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./muniuri.toml when present).
    #[arg(short, long, global = true, env = "MUNIURI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Query the endpoints and update the municipality table.
    Run {
        /// Write the merged table here instead of back to the data package.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Merge and report, but do not write anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with the default settings.
    Init {
        /// Where to write it.
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "muniuri=info",
        1 => "muniuri=debug",
        _ => "muniuri=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { output, dry_run } => cmd_run(config_path, output, dry_run).await,
        Command::Config { action } => match action {
            ConfigAction::Init { path } => cmd_config_init(&path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

async fn cmd_run(config_path: Option<&Path>, output: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let app: AppConfig = load_config(config_path)?;

    info!(
        package = %app.package.path.display(),
        sources = app.sources.len(),
        dry_run,
        "starting enrichment"
    );

    let config = EnrichConfig {
        app,
        output,
        dry_run,
    };

    let reporter = CliProgress::new();
    let result = muniuri_core::pipeline::run_enrichment(&config, &reporter)
        .await
        .wrap_err("enrichment failed")?;

    let summary = &result.summary;
    println!();
    if result.written {
        println!("  Municipality table updated!");
    } else {
        println!("  Dry run, nothing written.");
    }
    println!("  Output:         {}", result.output_path.display());
    println!("  Fetched rows:   {}", summary.fetched_rows);
    println!("  Identifiers:    {}", summary.identifiers);
    println!("  Matched:        {}/{}", summary.matched, summary.municipalities);
    for uri_type in UriType::ALL {
        println!(
            "  {:<15} {} updated, {} preserved",
            format!("{uri_type}:"),
            summary.updated.get(&uri_type).copied().unwrap_or(0),
            summary.preserved.get(&uri_type).copied().unwrap_or(0),
        );
    }
    if summary.unmatched_states > 0 || summary.unclassified > 0 {
        println!(
            "  Skipped:        {} unknown state, {} unknown URI prefix",
            summary.unmatched_states, summary.unclassified
        );
    }
    println!("  Time:           {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_fetched(&self, source: &str, rows: usize, current: usize, total: usize) {
        self.spinner
            .println(format!("  [{current}/{total}] {source}: {rows} rows"));
    }

    fn done(&self, _result: &EnrichResult) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init(path: &Path) -> Result<()> {
    write_default_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
