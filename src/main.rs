//! Pagespeed-Harvest main entry point
//!
//! This is the command-line interface for the PageSpeed Insights harvester.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pagespeed_harvest::config::{load_config, validate, ConfigOverrides, HarvestConfig};
use pagespeed_harvest::crawler::{
    expand_home, listen_for_shutdown, today_session_path, Coordinator,
};
use pagespeed_harvest::insights::fetch_one_report;
use pagespeed_harvest::output::{
    export_reports, load_statistics, print_statistics, JsonDirectorySink, LoggingSink, ResultSink,
};
use pagespeed_harvest::storage::{open_store, QueueStore};
use pagespeed_harvest::Strategy;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Pagespeed-Harvest: a resumable PageSpeed Insights harvester
///
/// Reads a site's sitemap, probes every URL, and fetches PageSpeed Insights
/// reports for every HTML page under the API quota. Progress is kept in a
/// per-day session database so an interrupted run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "pagespeed-harvest")]
#[command(version = "2.0.0")]
#[command(about = "A resumable PageSpeed Insights harvester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch PageSpeed Insights reports for every page in a sitemap
    FetchInsights(FetchArgs),

    /// Fetch a single report and print it, without a session database
    FetchOne(FetchOneArgs),

    /// Show statistics from a session database and exit
    Stats {
        /// Path to the session database
        #[arg(long)]
        database: PathBuf,
    },

    /// Write every fetched report in a session database as JSON
    ExportReports {
        /// Path to the session database
        #[arg(long)]
        database: PathBuf,

        /// Directory to write reports into
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Site origin, e.g. https://www.example.com
    #[arg(long)]
    hostname: String,

    /// PageSpeed Insights API key (may also come from the config file)
    #[arg(short = 'k', long)]
    apikey: Option<String>,

    /// Queue items fetched per round [default: 20]
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// Sitemap path appended to the hostname
    #[arg(short = 's', long, default_value = "/sitemap.xml")]
    sitemap: String,

    /// Directory for session databases [default: ./data]
    #[arg(long)]
    queue_data_directory: Option<String>,

    /// Maximum number of requests in flight [default: 10]
    #[arg(long)]
    max_concurrent_requests: Option<usize>,

    /// Probe requests started per second [default: 40]
    #[arg(long)]
    max_requests_per_second: Option<usize>,

    /// Per-request timeout in milliseconds [default: 30000]
    #[arg(short = 't', long)]
    request_timeout: Option<u64>,

    /// Optional TOML configuration file; flags override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Leave items stranded in PROCESSING by an earlier run untouched
    #[arg(long)]
    no_requeue: bool,

    /// Also write every fetched report as JSON into this directory
    #[arg(long)]
    report_dir: Option<String>,
}

#[derive(Args, Debug)]
struct FetchOneArgs {
    /// Page to analyse
    #[arg(long)]
    url: String,

    /// DESKTOP or MOBILE (any case)
    #[arg(long, default_value = "MOBILE")]
    strategy: Strategy,

    /// PageSpeed Insights API key (may also come from the config file)
    #[arg(short = 'k', long)]
    apikey: Option<String>,

    /// Optional TOML configuration file for endpoint, categories and timeout
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

impl FetchArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.apikey.clone(),
            batch_size: self.batch_size,
            queue_data_directory: self.queue_data_directory.clone(),
            max_concurrent_requests: self.max_concurrent_requests,
            max_requests_per_second: self.max_requests_per_second,
            request_timeout_ms: self.request_timeout,
            requeue_interrupted: self.no_requeue.then_some(false),
            report_directory: self.report_dir.clone(),
        }
    }

    fn sitemap_url(&self) -> String {
        format!("{}{}", self.hostname.trim_end_matches('/'), self.sitemap)
    }
}

/// Command-line defaults that differ from the configuration file defaults
fn cli_defaults() -> ConfigOverrides {
    ConfigOverrides {
        max_concurrent_requests: Some(10),
        max_requests_per_second: Some(40),
        request_timeout_ms: Some(30_000),
        ..ConfigOverrides::default()
    }
}

/// How a command ended unsuccessfully
enum Failure {
    /// Could not get as far as running: bad config, data directory, or store
    Setup(anyhow::Error),

    /// The run itself aborted
    Fatal(anyhow::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::FetchInsights(args) => handle_fetch(args).await,
        Command::FetchOne(args) => handle_fetch_one(args).await,
        Command::Stats { database } => handle_stats(&database),
        Command::ExportReports { database, output } => handle_export(&database, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Setup(e)) => {
            eprintln!("Setup failed: {:#}", e);
            ExitCode::from(2)
        }
        Err(Failure::Fatal(e)) => {
            eprintln!("Harvest failed: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagespeed_harvest=info,warn"),
            1 => EnvFilter::new("pagespeed_harvest=debug,info"),
            2 => EnvFilter::new("pagespeed_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges defaults, the optional config file and the flags, then validates
fn build_config(args: &FetchArgs) -> anyhow::Result<HarvestConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("could not load config {}", path.display()))?
        }
        None => {
            let mut config = HarvestConfig::default();
            cli_defaults().apply(&mut config);
            config
        }
    };

    args.overrides().apply(&mut config);
    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the fetch-insights command
async fn handle_fetch(args: FetchArgs) -> Result<(), Failure> {
    let config = build_config(&args).map_err(Failure::Setup)?;

    let data_directory = expand_home(&config.output.queue_data_directory);
    std::fs::create_dir_all(&data_directory)
        .with_context(|| format!("could not create data folder {}", data_directory.display()))
        .map_err(Failure::Setup)?;

    let session_path = today_session_path(&data_directory);
    tracing::info!("Session database: {}", session_path.display());
    let mut store = open_store(&session_path)
        .with_context(|| format!("could not open {}", session_path.display()))
        .map_err(Failure::Setup)?;

    let mut sink: Box<dyn ResultSink> = match &config.output.report_directory {
        Some(directory) => Box::new(
            JsonDirectorySink::new(expand_home(directory))
                .context("could not create report directory")
                .map_err(Failure::Setup)?,
        ),
        None => Box::new(LoggingSink),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    listen_for_shutdown(Arc::clone(&shutdown))
        .context("could not install signal handlers")
        .map_err(Failure::Setup)?;

    let sitemap_url = args.sitemap_url();
    let outcome = match Coordinator::from_config(&config, &mut store, sink.as_mut()) {
        Ok(coordinator) => {
            let mut coordinator = coordinator.with_shutdown(shutdown);
            coordinator.run(&sitemap_url).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = store.close() {
        tracing::warn!("Failed to close session database: {}", e);
    }

    match outcome {
        Ok(summary) => {
            println!(
                "Processed {} items: {} fetched, {} failed ({} URLs ignored){}",
                summary.processed,
                summary.fetched,
                summary.failed,
                summary.ignored,
                if summary.interrupted {
                    "; interrupted, rerun to continue"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Err(e) => Err(Failure::Fatal(e.into())),
    }
}

/// Handles the fetch-one command: prints one report as JSON
async fn handle_fetch_one(args: FetchOneArgs) -> Result<(), Failure> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("could not load config {}", path.display()))
            .map_err(Failure::Setup)?,
        None => HarvestConfig::default(),
    };
    ConfigOverrides {
        api_key: args.apikey.clone(),
        ..ConfigOverrides::default()
    }
    .apply(&mut config);
    validate(&config)
        .context("invalid configuration")
        .map_err(Failure::Setup)?;

    tracing::info!("Fetching {} report for {}", args.strategy, args.url);
    let report = fetch_one_report(&config.insights, &args.url, args.strategy)
        .await
        .with_context(|| format!("could not fetch a report for {}", args.url))
        .map_err(Failure::Fatal)?;

    let rendered = serde_json::to_string_pretty(&report)
        .context("could not render report")
        .map_err(Failure::Fatal)?;
    println!("{}", rendered);
    Ok(())
}

/// Handles the stats command: shows statistics from a session database
fn handle_stats(database: &Path) -> Result<(), Failure> {
    println!("Database: {}\n", database.display());

    let mut store = open_existing(database)?;
    let stats = load_statistics(&store)
        .context("could not read statistics")
        .map_err(Failure::Fatal)?;
    print_statistics(&stats);

    store
        .close()
        .context("could not close database")
        .map_err(Failure::Fatal)
}

/// Handles the export-reports command
fn handle_export(database: &Path, output: &Path) -> Result<(), Failure> {
    let mut store = open_existing(database)?;
    let mut sink = JsonDirectorySink::new(output)
        .context("could not create output directory")
        .map_err(Failure::Setup)?;

    let exported = export_reports(&store, &mut sink)
        .context("export failed")
        .map_err(Failure::Fatal)?;
    println!("✓ Exported {} reports to: {}", exported, output.display());

    store
        .close()
        .context("could not close database")
        .map_err(Failure::Fatal)
}

/// Opens a session database that must already exist
fn open_existing(database: &Path) -> Result<pagespeed_harvest::SqliteQueueStore, Failure> {
    if !database.exists() {
        return Err(Failure::Setup(anyhow::anyhow!(
            "database {} does not exist",
            database.display()
        )));
    }

    open_store(database)
        .with_context(|| format!("could not open {}", database.display()))
        .map_err(Failure::Setup)
}
