use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::style::Stylize;
use importsync::catalog::Catalog;
use importsync::config::Config;
use importsync::dispatch::{extract, ImplementationMap};
use importsync::docs::DocsClient;
use importsync::pipeline::{self, CoverageSummary, Validator};
use importsync::report;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Validate and update Terraform import ID generation against provider docs
#[derive(Parser, Debug)]
#[command(name = "importsync", version, about, long_about = None)]
struct Args {
    /// Resource catalog file (one resource type per line)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Source file containing the import ID dispatch table
    #[arg(long, global = true)]
    dispatch: Option<PathBuf>,

    /// Base URL of the resource documentation pages
    #[arg(long, global = true)]
    docs_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report catalog coverage of the dispatch table
    Summary,
    /// Fetch and classify every resource, then report status counts
    Validate {
        /// Write the findings as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate, then insert branches for every resource needing an update
    Update {
        /// Apply without asking for confirmation
        #[arg(long)]
        yes: bool,
        /// Write the findings as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Check specific resources or wildcard patterns without writing anything
    Check {
        /// Resource types or patterns such as "aws_api_gateway_*"
        resources: Vec<String>,
        /// Additional wildcard pattern
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// Show the effective configuration, or write the default file
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
        /// With --init, replace an existing file
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("importsync started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("importsync").join("importsync.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".importsync").join("importsync.log");
    }
    PathBuf::from("importsync.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();
    if let Some(path) = args.catalog {
        config.catalog_path = path;
    }
    if let Some(path) = args.dispatch {
        config.dispatch_path = path;
    }
    if let Some(url) = args.docs_url {
        config.docs_base_url = url;
    }

    match args.command.unwrap_or(Command::Summary) {
        Command::Summary => {
            report::print_banner();
            let (catalog, implemented) = load_inputs(&config)?;
            report::print_summary(&CoverageSummary::compute(&catalog, &implemented));
            println!();
            println!("Quick summary complete. Run `validate` or `update` for pattern checks.");
        }
        Command::Validate { report } => {
            run_validation(&config, report, None).await?;
        }
        Command::Update { yes, report } => {
            run_validation(&config, report, Some(yes)).await?;
        }
        Command::Check {
            mut resources,
            patterns,
        } => {
            resources.extend(patterns);
            run_check(&config, &resources).await?;
        }
        Command::Config { init, force } => {
            if init {
                match Config::config_path() {
                    Some(path) if Config::write_default(&path, force)? => {
                        println!("Wrote default configuration to {}", path.display())
                    }
                    Some(path) => println!(
                        "{} already exists; pass --force to replace it",
                        path.display()
                    ),
                    None => println!("No configuration directory available"),
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Load the catalog (fatal if missing) and extract the dispatch table
/// (degrades to empty if unavailable)
fn load_inputs(config: &Config) -> Result<(Catalog, ImplementationMap)> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let implemented = extract_or_empty(config, &catalog);
    Ok((catalog, implemented))
}

fn extract_or_empty(config: &Config, catalog: &Catalog) -> ImplementationMap {
    match extract::extract_file(&config.dispatch_path, catalog, &config.dialect) {
        Ok(implemented) => implemented,
        Err(e) => {
            tracing::error!("Extraction failed: {}", e);
            println!("{} {}", "✘ Error:".red(), e);
            ImplementationMap::new()
        }
    }
}

fn validator(config: &Config) -> Result<Validator<DocsClient>> {
    let client = DocsClient::from_config(config)?;
    Ok(Validator::new(
        client,
        config.dialect.clone(),
        config.fetch_delay(),
    ))
}

/// Validate every catalog resource; with `update = Some(skip_prompt)`,
/// offer to apply the pending updates afterwards
async fn run_validation(config: &Config, report_path: Option<PathBuf>, update: Option<bool>) -> Result<()> {
    report::print_banner();
    let (catalog, implemented) = load_inputs(config)?;
    let coverage = CoverageSummary::compute(&catalog, &implemented);
    report::print_summary(&coverage);

    println!();
    println!("{}", "VALIDATING PATTERNS...".bold());
    println!("Fetching patterns from {}", config.docs_base_url);

    let validator = validator(config)?;
    let run = validator
        .validate(&catalog, &implemented, report::print_progress)
        .await;
    println!();

    report::print_status_counts(&run.status_counts());
    report::print_fetch_diagnostics(&run);
    let updates = run.updates();
    println!();
    println!("Resources needing updates: {}", updates.len());

    if let Some(path) = report_path {
        report::write_json_report(&path, &coverage, &run)?;
        println!("Report written to {}", path.display());
    }

    let Some(skip_prompt) = update else {
        println!();
        println!("Validation complete.");
        return Ok(());
    };

    if updates.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    report::print_update_preview(&updates);

    if !skip_prompt
        && !confirm(&format!(
            "Update {} with {} improvements? (y/N): ",
            config.dispatch_path.display(),
            updates.len()
        ))?
    {
        println!("Update skipped");
        return Ok(());
    }

    println!();
    println!("Generating update code...");
    match pipeline::apply_updates(&config.dispatch_path, &run, &catalog, &config.dialect) {
        Ok(outcome) => {
            println!(
                "{} Updated {} with {} resources",
                "✔".green(),
                outcome.patch.path.display(),
                outcome.patch.resources
            );
            println!("New coverage: {:.1}%", outcome.coverage.coverage_pct);
            let improvement = outcome.coverage.coverage_pct - coverage.coverage_pct;
            if improvement > 0.0 {
                println!("Improved by {:.1}%", improvement);
            }
        }
        Err(e) => {
            tracing::error!("Update failed: {}", e);
            println!("{} Update failed: {}", "✘".red(), e);
            return Err(e.into());
        }
    }

    Ok(())
}

async fn run_check(config: &Config, requested: &[String]) -> Result<()> {
    if requested.is_empty() {
        println!("Usage: importsync check <resource_type> [resource_type2] ...");
        println!("  importsync check aws_lambda_function");
        println!("  importsync check aws_s3_bucket aws_iam_role");
        println!("  importsync check --pattern \"aws_api_gateway_*\"");
        return Ok(());
    }

    let catalog = Catalog::load(&config.catalog_path).unwrap_or_else(|e| {
        tracing::warn!("{}; checking without catalog defaults", e);
        Catalog::default()
    });
    let implemented = extract_or_empty(config, &catalog);
    if implemented.is_empty() {
        println!(
            "{} Could not load implemented resources from {}",
            "✘".red(),
            config.dispatch_path.display()
        );
        return Ok(());
    }

    let selection = pipeline::select_resources(requested, &implemented);
    report::print_unmatched(&selection);

    if selection.resources.is_empty() {
        println!("{} No resources to test", "✘".red());
        return Ok(());
    }

    println!("Testing {} resources", selection.resources.len());
    println!("{}", "=".repeat(50));

    let validator = validator(config)?;
    for finding in validator.check(&selection.resources, &implemented).await {
        report::print_finding(&finding);
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("\n{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
