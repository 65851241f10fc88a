//! Chapter-Chain main entry point
//!
//! This is the command-line interface for the Chapter-Chain document fetcher.

use anyhow::{Context, Result};
use chapter_chain::config::{load_config, validate, Config};
use chapter_chain::crawler::{build_engine, DoneReason, TraversalReport};
use chapter_chain::output::{format_source_listing, parse_selection};
use chapter_chain::storage::{open_store, JsonProgressStore};
use chapter_chain::{ChainError, ProgressStore, Source, SourceId};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Chapter-Chain: a resumable chapter downloader
///
/// Starting from an entry page, Chapter-Chain saves every page and follows
/// its "next" link until the chain ends. Progress is recorded after every
/// page, so an interrupted download picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "chapter-chain")]
#[command(version = "1.0.0")]
#[command(about = "A resumable chapter downloader", long_about = None)]
struct Cli {
    /// Entry URLs of the documents to download; omit to pick one to resume
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Directory chapters are written to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the progress table
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// List downloads in progress and exit
    #[arg(long, conflicts_with_all = ["clean", "delete", "urls"])]
    list: bool,

    /// Remove finished downloads from the progress table and exit
    #[arg(long, conflicts_with_all = ["list", "delete", "urls"])]
    clean: bool,

    /// Remove one download from the progress table by its id and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["list", "clean", "urls"])]
    delete: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let store = open_store(&config.output.state_file);

    if cli.list {
        handle_list(&store)
    } else if cli.clean {
        handle_clean(&store)
    } else if let Some(id) = &cli.delete {
        handle_delete(&store, id)
    } else if cli.urls.is_empty() {
        handle_resume_menu(&config, &store).await
    } else {
        handle_download(&config, &cli.urls).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("chapter_chain=info,warn"),
            1 => EnvFilter::new("chapter_chain=debug,info"),
            2 => EnvFilter::new("chapter_chain=trace,debug"),
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

/// Loads the config file if one was given, then applies command-line overrides
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    if let Some(state_file) = &cli.state_file {
        config.output.state_file = state_file.clone();
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles --list: prints every download still in progress
fn handle_list(store: &JsonProgressStore) -> Result<()> {
    let entries = store.list_all()?;

    if entries.is_empty() {
        println!("{}", "No downloads in progress.".yellow());
        return Ok(());
    }

    println!("{}", "Downloads in progress:".bright_cyan().bold());
    print!("{}", format_source_listing(&entries));
    Ok(())
}

/// Handles --clean: drops records whose chain already finished
fn handle_clean(store: &JsonProgressStore) -> Result<()> {
    let removed = store.purge_completed()?;
    println!(
        "{} Removed {} finished download(s) from {}",
        "✓".green(),
        removed,
        store.path().display()
    );
    Ok(())
}

/// Handles --delete: removes one record by its source id
fn handle_delete(store: &JsonProgressStore, id: &str) -> Result<()> {
    let id = SourceId::new(id);

    if store.delete(&id)? {
        println!("{} Deleted progress for {}", "✓".green(), id);
        Ok(())
    } else {
        Err(ChainError::OperatorInput(format!("No download with id {}", id)).into())
    }
}

/// Shows the in-progress list and resumes the download the operator picks
async fn handle_resume_menu(config: &Config, store: &JsonProgressStore) -> Result<()> {
    let entries = store.list_all()?;

    if entries.is_empty() {
        println!(
            "{}",
            "No downloads in progress. Pass an entry URL to start one.".yellow()
        );
        return Ok(());
    }

    println!("{}", "Downloads in progress:".bright_cyan().bold());
    print!("{}", format_source_listing(&entries));
    print!("{} ", "Enter the number of the download to resume:".bright_cyan());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let index = parse_selection(&input, entries.len())?;

    let (id, record) = &entries[index];
    let source = Source::from_record(id.clone(), record, &config.output.directory)
        .map_err(ChainError::from)?;

    println!(
        "{} Resuming download from: {}",
        "→".green(),
        record.cursor.as_deref().unwrap_or(source.entry_url().as_str())
    );

    run_source(config, &source).await.map(|_| ())
}

/// Downloads each URL in turn, stopping at the first failure
async fn handle_download(config: &Config, urls: &[String]) -> Result<()> {
    for url in urls {
        let source = Source::new(url, &config.output.directory).map_err(ChainError::from)?;
        run_source(config, &source).await?;
    }
    Ok(())
}

/// Runs one source with a spinner counting saved chapters
async fn run_source(config: &Config, source: &Source) -> Result<TraversalReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Downloading {}", source.entry_url()));

    let ticker = spinner.clone();
    let engine = build_engine(config)?.with_progress_callback(Arc::new(
        move |saved: usize, url: &Url| {
            ticker.set_message(format!("{} chapter(s) saved, last {}", saved, url));
        },
    ));

    let result = engine.run(source).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            println!(
                "{} Saved {} chapter(s) to {} ({})",
                "✓".green(),
                report.pages_saved,
                report.output_location.display(),
                describe(&report.reason)
            );
            Ok(report)
        }
        Err(e) => {
            println!(
                "{} Download of {} stopped; run again to resume (id {})",
                "✗".red(),
                source.entry_url(),
                source.id().short()
            );
            Err(e.into())
        }
    }
}

fn describe(reason: &DoneReason) -> String {
    match reason {
        DoneReason::NoNextLink => "no next link".to_string(),
        DoneReason::Cycle(url) => format!("next link {} already saved", url),
        DoneReason::AlreadyVisited(url) => format!("{} already saved", url),
        DoneReason::AlreadyComplete => "already complete".to_string(),
    }
}
