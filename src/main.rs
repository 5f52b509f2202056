// Main entry point - Dependency injection, server setup and the watch client
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::feed_service::FeedService;
use crate::domain::chart::Retention;
use crate::infrastructure::config::load_feed_config;
use crate::infrastructure::sample_sources::source_from_settings;
use crate::infrastructure::ws_client::{watch, WatchOptions};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;
use crate::presentation::terminal::render_chart;

#[derive(Parser)]
#[command(name = "artemis-live", about = "Live column dashboard for an Artemis data logger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the logger and serve the live feed over WebSocket
    ///
    /// The serial port's baud rate is not set by this command. Configure the
    /// device beforehand (the Artemis logger runs at 115200 baud, e.g.
    /// `stty -F /dev/ttyUSB0 115200 raw`) or on the serial-over-TCP bridge.
    Serve,
    /// Connect to a feed server and chart one column in the terminal
    Watch {
        /// Feed server socket URL
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        /// Columns to select and submit whenever the header arrives
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Keep only the newest N points on the chart
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        window: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve => serve().await,
        Command::Watch { url, columns, window } => {
            let retention = match window {
                Some(n) => Retention::Window(n as usize),
                None => Retention::Unbounded,
            };
            let options = WatchOptions { url, columns, retention };
            watch(options, render_chart).await
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    // Load configuration
    let config = load_feed_config()?;

    // Create feed service and start reading the logger
    let feed_service = FeedService::new(
        config.source.header_marker.clone(),
        config.source.channel_capacity,
    );
    let source = source_from_settings(&config.source);
    let reconnect_delay = Duration::from_secs(config.source.reconnect_secs);
    let ingest = feed_service.clone();
    tokio::spawn(async move { ingest.run(source, reconnect_delay).await });

    let state = Arc::new(AppState { feed_service });
    let app = router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting artemis-live feed server on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
