//! RevSummary - annotation review summaries for labeling tasks
//!
//! A CLI tool that reads task snapshots (control schemas plus submitted
//! annotations) and writes a summary report that aggregates every
//! control across annotations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable input, invalid config, strict validation failure)

mod analysis;
mod cli;
mod config;
mod error;
mod extract;
mod layout;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use loader::{LoadOptions, SnapshotLoader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Read the config first so `verbose` in the file can raise the log level
    let loaded_config = load_config(&args);
    let config_verbose = loaded_config
        .as_ref()
        .is_ok_and(|(config, _)| config.general.verbose);

    // Initialize logging
    init_logging(&args, config_verbose);

    info!("RevSummary v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = loaded_config.and_then(|(config, source)| {
        log_config_source(&source);
        run_summary(args, config)
    });

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Summary failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .revsummary.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize output, layout, and sections.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load snapshots, build the report and write it out.
fn run_summary(args: Args, mut config: Config) -> Result<()> {
    let start_time = Instant::now();

    config.merge_with_args(&args);

    let input = args.input.clone().context("An input path is required")?;

    if !args.quiet {
        println!("📥 Loading snapshots from: {}", input.display());
    }

    let loader = SnapshotLoader::new(
        input.clone(),
        LoadOptions {
            strict: config.general.strict,
            show_progress: !args.quiet,
        },
    );
    let loaded = match loader.load() {
        Ok(loaded) => loaded,
        Err(e) if e.is_validation() => {
            return Err(anyhow::Error::new(e)
                .context("Snapshot validation failed (run without --strict to drop invalid results)"));
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to load snapshots from {}", input.display())));
        }
    };

    if loaded.dropped > 0 {
        warn!(
            "{} result(s) referenced unknown controls and were dropped",
            loaded.dropped
        );
    }

    let source = input.display().to_string();
    let report = report::build_report(&loaded, &source, &config.report);

    let format = config.output_format();
    let output = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    info!(
        "Wrote {} report for {} tasks in {:.2}s",
        format.as_str(),
        report.metadata.tasks,
        start_time.elapsed().as_secs_f64()
    );

    if !args.quiet {
        println!("\n📊 Summary:");
        println!("   Files loaded: {}", report.metadata.files_loaded);
        println!("   Tasks: {}", report.metadata.tasks);
        println!("   Annotations: {}", report.metadata.annotations);
        if report.metadata.results_dropped > 0 {
            println!("   Results dropped: {}", report.metadata.results_dropped);
        }
        if report.metadata.records_skipped > 0 {
            println!("   Records skipped: {}", report.metadata.records_skipped);
        }
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    Ok(())
}

/// Where the configuration came from.
enum ConfigSource {
    File(PathBuf),
    Default,
    Builtin,
    Invalid(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized; the source is logged afterwards
/// with `log_config_source`.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::Default)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Invalid(e))),
    }
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::File(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE),
        ConfigSource::Builtin => debug!("No config file found, using defaults"),
        ConfigSource::Invalid(e) => warn!("Failed to load config: {:#}", e),
    }
}
