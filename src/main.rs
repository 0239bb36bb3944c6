use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use tidings::config::Config;
use tidings::engine::{
    run_scheduler, Engine, EngineEvent, EngineOptions, SchedulerConfig,
};
use tidings::feed::{parse_opml, HttpTransport};
use tidings::keybindings::KeyBindings;
use tidings::storage::{Database, StoreError};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Get the config directory path (~/.config/tidings/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("tidings"))
}

#[derive(Parser, Debug)]
#[command(name = "tidings", about = "Feed aggregation engine: poll, dedup, track article state")]
struct Args {
    /// Configuration file (default: ~/.config/tidings/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Article database (default: ~/.config/tidings/articles.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Run a single reconciliation cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let db_path = args.db.unwrap_or_else(|| config_dir.join("articles.db"));

    // Malformed configuration is fatal at startup
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Validate the binding table on behalf of the presentation layer;
    // a key bound to two actions aborts startup.
    let _bindings = KeyBindings::with_overrides(&config.keybindings)
        .context("Invalid keybindings in config")?;

    let mut sources = config.feeds.clone();
    if let Some(opml_file) = &config.opml_file {
        let opml_sources = parse_opml(opml_file)
            .await
            .with_context(|| format!("Failed to load OPML file {}", opml_file))?;
        tracing::info!(count = opml_sources.len(), file = %opml_file, "Loaded OPML subscriptions");
        sources.extend(opml_sources);
    }
    if sources.is_empty() {
        eprintln!("Warning: no feed sources configured");
        eprintln!("Add feeds to {} or point opml_file at a subscription file.", config_path.display());
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of tidings appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let transport = HttpTransport::new().context("Failed to build HTTP client")?;
    let engine = Arc::new(Engine::new(
        db,
        transport,
        sources,
        EngineOptions::from(&config),
    ));

    // Show persisted state first, then clean up and fetch.
    engine.reload().await.context("Failed to load articles")?;
    if let Err(e) = engine.purge().await {
        tracing::warn!(error = %e, "Startup retention purge failed");
    }
    match engine.refresh().await {
        Ok(summary) => tracing::info!(
            new = summary.inserted,
            total = summary.total,
            failed_sources = summary.sources_failed,
            "Initial fetch complete"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial fetch failed"),
    }

    if args.once {
        for feed in engine.feeds() {
            println!("{:<30} {:>5} unread / {:>5} total", feed.name, feed.unread, feed.total);
        }
        return Ok(());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<EngineEvent>(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = tokio::spawn(run_scheduler(
        engine.clone(),
        SchedulerConfig {
            update_interval: Duration::from_secs(config.seconds_between_updates),
            ..SchedulerConfig::default()
        },
        event_tx,
        shutdown_rx,
    ));

    // Signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt, shutting down");
                break;
            }
            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            }
            event = event_rx.recv() => match event {
                Some(EngineEvent::Refreshed(summary)) => {
                    tracing::info!(
                        new = summary.inserted,
                        total = summary.total,
                        failed_sources = summary.sources_failed,
                        "Feeds updated"
                    );
                }
                Some(EngineEvent::RefreshFailed(error)) => {
                    tracing::warn!(error = %error, "Feed update failed");
                }
                Some(EngineEvent::ViewTick) => {
                    tracing::debug!("View refresh tick");
                }
                None => break,
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = scheduler.await;

    println!("Goodbye!");
    Ok(())
}
