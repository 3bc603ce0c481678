//! Terminal dashboard for parcelli that keeps polling shipment statuses in the background.

mod app;
mod config;
mod input;
mod logging;
mod ui;

use std::{io, path::PathBuf, sync::Arc, time::Duration as StdDuration};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parcelli_core::{
    Normalizer, PollScheduler, ProviderRegistry, TrackerEvent, TrackerService, TrackingStore,
};
use parcelli_provider_parcelsapp as parcelsapp;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{FileShipmentSource, TrackerConfig};
use crate::input::Action;

/// Follow parcel shipments across tracking providers.
#[derive(Parser, Debug)]
#[command(name = "parcelli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "parcelli.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log updates instead of drawing the dashboard.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TrackerConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.headless {
        logging::init_stderr(&args.log_level);
    } else if let Some(path) = &config.log_file {
        logging::init_file(&args.log_level, path)
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    info!(
        shipments = config.shipments.len(),
        language = %config.language,
        "configuration loaded"
    );

    // HTTP + service setup
    let client = Client::builder().user_agent("parcelli/0.1").build()?;
    let normalizer = Arc::new(Normalizer::new(&config.language));

    let credentials = &config.providers.parcelsapp;
    let plugins = [parcelsapp::plugin_at(
        client,
        credentials.api_key.as_deref(),
        credentials.base_url.as_deref().unwrap_or(parcelsapp::BASE_URL),
    )]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    let registry = Arc::new(ProviderRegistry::new(plugins));
    if registry.is_empty() {
        warn!("no provider has an API key, shipments will stay untracked");
    } else {
        info!(providers = registry.len(), "providers registered");
    }
    let service = Arc::new(TrackerService::new(registry, Arc::clone(&normalizer)));

    // Polling
    let store = Arc::new(TrackingStore::new());
    let (events_tx, events_rx) = unbounded_channel();
    let scheduler = PollScheduler::new(
        Arc::clone(&service),
        Arc::clone(&store),
        Arc::new(FileShipmentSource::new(args.config.clone())),
        config.fetch_interval(),
    )
    .with_events(events_tx);
    let status = scheduler.status();
    let shutdown = CancellationToken::new();
    let polling = tokio::spawn(scheduler.run(shutdown.clone()));

    let res = if args.headless {
        run_headless(&store, &normalizer, events_rx).await;
        Ok(())
    } else {
        let providers = service
            .providers()
            .into_iter()
            .map(|meta| meta.name)
            .collect();
        let app = App::new(store, normalizer, status, providers);
        run_terminal(app, events_rx).await
    };

    shutdown.cancel();
    polling.await?;
    res
}

async fn run_headless(
    store: &TrackingStore,
    normalizer: &Normalizer,
    mut events: UnboundedReceiver<TrackerEvent>,
) {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    TrackerEvent::Updated { changed: true, .. } | TrackerEvent::Ready => {
                        for shipment in store.snapshot(normalizer) {
                            info!(
                                code = %shipment.code,
                                label = shipment.label.as_deref().unwrap_or(""),
                                location = shipment.location.as_deref().unwrap_or(""),
                                date = shipment.date.as_deref().unwrap_or(""),
                                status = shipment.status.as_deref().unwrap_or(""),
                                "shipment"
                            );
                        }
                    }
                    TrackerEvent::Updated { changed: false, .. } => {
                        info!("update carried no known shipments");
                    }
                    TrackerEvent::ConfigurationFailed { message } => {
                        warn!(%message, "configuration could not be read");
                    }
                }
            }
        }
    }
}

async fn run_terminal(app: App, events: UnboundedReceiver<TrackerEvent>) -> Result<()> {
    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut events: UnboundedReceiver<TrackerEvent>,
) -> Result<()> {
    loop {
        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Drain scheduler notifications
        loop {
            match events.try_recv() {
                Ok(event) => {
                    app.handle_event(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
            && input::handle_key_event(key, &mut app) == Action::Quit
        {
            break;
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}
