//! Blogkeeper - headless front end for the blog library.
//!
//! # Overview
//!
//! This binary wires the library core to a terminal. It initializes:
//! - Logging infrastructure (daily rotating file, optional console output)
//! - Tokio async runtime
//! - Settings ([`ConfigManager`]: `Settings.yaml` + `BLOGKEEPER_*` overrides)
//! - The [`ManagerController`] with the HTTP tumblr fetcher and an in-process crawl signal
//!
//! # Commands
//!
//! - `list`: load the library and print every blog
//! - `add <url>...`: add blogs through the batched pipeline
//! - `remove <name>...`: remove blogs (content too unless `delete_only_index` is set)
//! - `enqueue-auto`: enqueue by the configured auto-enqueue mode
//! - `watch`: treat each stdin line as a clipboard change

use anyhow::{Context, Result};
use blogkeeper::crawler::TumblrFetcher;
use blogkeeper::logging::{self, LogFormat};
use blogkeeper::services::BatchOutcome;
use blogkeeper::state::next_change;
use blogkeeper::{
    APP_NAME, ConfigManager, CrawlSignal, DefaultFetcherFactory, LibraryChange, ManagerController,
    VERSION,
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "blogkeeper", version, about = "Manage a library of blogs and their download queue")]
struct Cli {
    /// Directory holding Settings.yaml
    #[arg(long, default_value = "Blogkeeper Data")]
    config_dir: Utf8PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Also log to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Write the log file as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every blog in the library
    List,
    /// Add blogs by URL
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Remove blogs by name
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Enqueue blogs using the configured auto-enqueue mode
    EnqueueAuto,
    /// Read stdin and add the URLs on every line
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let _guard =
        logging::setup_logging_with_console(&cli.log_dir, APP_NAME, cli.debug, cli.verbose, format)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_settings()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("blogkeeper-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(async move {
        let fetcher = TumblrFetcher::new(Duration::from_secs(settings.request_timeout_secs))
            .context("Failed to create HTTP client")?;
        let controller = ManagerController::new(
            settings,
            Arc::new(DefaultFetcherFactory::new(Arc::new(fetcher))),
            Arc::new(CrawlSignal::new()),
        );

        let result = run(&controller, cli.command).await;
        controller.shutdown();
        result
    });

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");
    result
}

async fn run(controller: &ManagerController, command: Command) -> Result<()> {
    let summary = controller
        .initialize()
        .await
        .context("Failed to load the library")?;
    if summary.skipped > 0 {
        eprintln!("warning: {} index files skipped, see the log", summary.skipped);
    }

    match command {
        Command::List => {
            let blogs = controller.state().read(|s| s.registry.all());
            for blog in &blogs {
                println!(
                    "{:<32} {:<8} {:<7} {}",
                    blog.name,
                    blog.blog_type,
                    if blog.online { "online" } else { "offline" },
                    blog.title
                );
            }
            println!("{} blogs", blogs.len());
        }
        Command::Add { urls } => {
            let outcome = controller.add_blogs(urls).await;
            print_outcome(&outcome);
        }
        Command::Remove { names } => {
            let report = controller.remove_blogs(&names).await;
            for name in &report.removed {
                println!("removed {}", name);
            }
            for failure in &report.failures {
                eprintln!("error: {}", failure);
            }
        }
        Command::EnqueueAuto => {
            let outcome = controller.enqueue_auto().await?;
            match outcome.trigger {
                None => println!("library is empty, nothing to enqueue"),
                Some(trigger) => {
                    println!("enqueued {} blogs, crawl {:?}", outcome.enqueued, trigger);
                    for name in controller.state().read(|s| s.queue.names()) {
                        println!("  {}", name);
                    }
                }
            }
        }
        Command::Watch => watch(controller).await?,
    }

    Ok(())
}

/// Make sure clipboard signals are acted on; returns true if listening had been off
fn listen_for_watch(controller: &ManagerController) -> bool {
    if controller.is_clipboard_listening() {
        return false;
    }
    controller.set_clipboard_listening(true);
    true
}

async fn watch(controller: &ManagerController) -> Result<()> {
    if listen_for_watch(controller) {
        eprintln!("note: check_clipboard is off in the settings, listening anyway for watch");
    }

    let mut events = controller.state().subscribe();
    tokio::spawn(async move {
        while let Some(event) = next_change(&mut events).await {
            if let LibraryChange::OperationFailed { blog, message } = event {
                eprintln!("error [{}]: {}", blog, message);
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(batch) = controller.on_clipboard_changed(&line) else {
            continue;
        };
        match batch.await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => tracing::error!("Clipboard batch failed: {}", e),
        }
    }

    Ok(())
}

fn print_outcome(outcome: &BatchOutcome) {
    for blog in &outcome.added {
        println!("added {} ({})", blog.name, blog.url);
    }
    for url in &outcome.invalid {
        eprintln!("skipped {}: not a blog URL", url);
    }
    for failure in &outcome.failures {
        eprintln!("error: {}", failure);
    }
}
