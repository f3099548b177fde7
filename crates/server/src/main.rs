//! Reference server for the scroll teleport engine.
//!
//! Runs the engine against in-memory host collaborators and drives it from a
//! line console on stdin. Bindings persist under the data directory, and the
//! `reload` command re-reads the config and message files.
mod config;
mod console;
mod dirs;
mod logging;
mod world;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scroll_runtime::{EventBus, FileLocationRepository, ScrollRuntime, Shared, Topic};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use crate::config::{Args, FileConfigSource, ServerConfig};
use crate::console::{Console, Flow};
use crate::world::ReferenceHost;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = ServerConfig::from_args(args.clone())?;
    let _guard = logging::setup_logging(&config.log_dir)?;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        cooldown = config.scroll.cooldown_seconds,
        max_charges = config.scroll.max_charges,
        "Starting scroll server"
    );

    let repository = FileLocationRepository::new(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let host = ReferenceHost::new();
    let events = EventBus::new();
    let messages = Arc::new(Shared::new(config.messages));
    let runtime = host
        .install(ScrollRuntime::builder())
        .config(config.scroll)
        .repository(Arc::new(repository))
        .events(events.clone())
        .config_source(Arc::new(FileConfigSource::new(args, Arc::clone(&messages))))
        .build()?;

    for topic in [Topic::Teleport, Topic::Registry] {
        tokio::spawn(log_events(events.clone(), topic));
    }

    let (mut console, output) = Console::new(runtime, host, messages);
    let writer = tokio::spawn(write_output(output));
    run_console(&mut console).await?;

    // Dropping the console cancels in-flight requests and closes the output.
    drop(console);
    writer.await??;

    tracing::info!("Scroll server stopped");
    Ok(())
}

async fn run_console(console: &mut Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if console.handle(&line).await == Flow::Quit {
            break;
        }
    }
    Ok(())
}

async fn write_output(mut output: mpsc::UnboundedReceiver<String>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = output.recv().await {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn log_events(events: EventBus, topic: Topic) {
    let mut receiver = events.subscribe(topic);
    loop {
        match receiver.recv().await {
            Ok(event) => tracing::info!(topic = ?topic, "{:?}", event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(topic = ?topic, "Event logger lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
