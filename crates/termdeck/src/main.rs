//! # termdeck
//!
//! Terminal session deck: keeps a collection of PTY-backed terminal sessions,
//! tracks the selected one, and keeps thumbnails and previews of all of them
//! current.
//!
//! ## Overview
//!
//! The binary plays the windowing shell:
//! - Opens the configured number of terminals
//! - Delivers periodic ticks (engine events, thumbnail refresh, cleanup)
//! - Logs an overview of the deck as terminals come and go
//!
//! ## Architecture
//!
//! This is Layer 3 - the driver that ties together:
//! - termdeck-core: Core types, config, errors
//! - termdeck-emulator: Engine boundary and PTY engine
//! - termdeck-session: Session manager and host shim

use anyhow::Context;
use clap::Parser;
use termdeck::{config_schema, CliArgs, Runner};
use termdeck_core::DeckConfig;
use termdeck_emulator::PtyEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.schema {
        println!("{}", serde_json::to_string_pretty(&config_schema())?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => DeckConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DeckConfig::default(),
    };
    if let Some(sessions) = args.sessions {
        config.deck.startup_sessions = sessions;
        config.validate()?;
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.deck.log_level)),
        )
        .init();

    tracing::info!(
        "termdeck v{} starting: {} terminals, tick every {}ms",
        env!("CARGO_PKG_VERSION"),
        config.deck.startup_sessions,
        config.deck.tick_interval_ms
    );

    let engine = PtyEngine::new(config.terminal.clone());
    let runner = Runner::new(Box::new(engine), config);
    runner.open_startup_sessions(runner.config().deck.startup_sessions)?;

    let stats = runner
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    runner.shutdown();
    tracing::info!("termdeck shutting down after {} ticks", stats.ticks);

    Ok(())
}
