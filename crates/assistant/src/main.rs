//! Personal assistant server.
//!
//! Receives messages over HTTP webhooks, runs them through the orchestrator
//! and keeps the reminder and calendar timers running until Ctrl+C.

mod config;
mod routes;
mod sender;
mod state;

use std::sync::Arc;

use brain_core::Brain;
use calendar::{CalendarService, GoogleCalendar, StaticTokenProvider};
use chat_brain::ChatBrain;
use database::{SheetStore, SqliteSheetStore};
use orchestrator::{
    CalendarWatcher, Clock, EngineConfig, LoggingSender, MessageSender, Orchestrator, SystemClock, WatchPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_gateway::{GatewayClient, GatewayConfig};

use crate::config::Config;
use crate::sender::GatewaySender;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let mut engine = EngineConfig::from_env()?;
    info!(addr = %config.addr, "Starting assistant");

    let store = SqliteSheetStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let store: Arc<dyn SheetStore> = Arc::new(store);

    let brain: Arc<dyn Brain> = Arc::new(ChatBrain::from_env()?);

    let sender: Arc<dyn MessageSender> = match GatewayConfig::from_env() {
        Ok(gateway) => Arc::new(GatewaySender::new(GatewayClient::new(gateway)?)),
        Err(e) => {
            warn!("Gateway not configured ({}); outbound messages will only be logged", e);
            Arc::new(LoggingSender)
        }
    };

    let calendar: Option<Arc<dyn CalendarService>> = match &config.calendar_tokens {
        Some(pairs) => {
            let tokens = StaticTokenProvider::parse(pairs);
            if engine.calendar_accounts.is_empty() {
                engine.calendar_accounts = tokens.accounts();
            }
            Some(Arc::new(GoogleCalendar::new(Arc::new(tokens))?))
        }
        None => None,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut builder = Orchestrator::builder(brain, store, sender.clone())
        .clock(clock.clone())
        .config(engine.clone());
    if let Some(calendar) = &calendar {
        builder = builder.calendar(calendar.clone());
    }
    let orchestrator = Arc::new(builder.build());

    let shutdown = CancellationToken::new();
    let watcher = match (&calendar, &engine.owner_number) {
        (Some(calendar), Some(owner)) if !engine.calendar_accounts.is_empty() => {
            let watcher = Arc::new(CalendarWatcher::new(
                calendar.clone(),
                engine.calendar_accounts.clone(),
                sender,
                clock,
                owner.clone(),
                WatchPolicy::from(&engine),
            ));
            Some(watcher.spawn(engine.calendar_poll, engine.dedup_compact, shutdown.clone()))
        }
        _ => {
            info!("Calendar watcher disabled (needs linked calendars and ASSISTANT_OWNER_NUMBER)");
            None
        }
    };

    let app = routes::router().with_state(AppState::new(orchestrator.clone()));

    info!(addr = %config.addr, "Assistant listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    orchestrator.reminders().shutdown();
    if let Some(handle) = watcher {
        if let Err(e) = handle.await {
            warn!("Calendar watcher task failed: {}", e);
        }
    }

    info!("Assistant stopped");
    Ok(())
}

/// Resolve on Ctrl+C, cancelling the background timers.
async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        token.cancelled().await;
        return;
    }
    info!("Shutting down");
    token.cancel();
}
