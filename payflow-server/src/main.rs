//! payflow server
//!
//! Issues invoice batches against the payment processor on a schedule,
//! accepts signed payment callbacks and forwards the net amount of every
//! credited invoice to the settlement account.

mod api;
mod config;
mod register;
mod resources;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{CliOverrides, ConfigLoader, ProcessorSettings};
use payflow_core::events::event_queue;
use payflow_core::framework::connect_and_migrate;
use payflow_core::gateway::{EcdsaEventVerifier, EventOrigin};
use payflow_core::processors::{
    BatchEmitter, EmissionScheduler, EventProcessor, Reconciler, SettlementForwarder,
};
use payflow_core::telemetry::{HISTORY_CAPACITY, WebhookCounters, history};
use payflow_core::utils::payers::RandomPayers;
use payflow_sdk::client::{Credentials, ProcessorClient};
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// payflow - scheduled invoicing and webhook-driven settlement
#[derive(Parser, Debug)]
#[command(name = "payflow-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./payflow.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Talk to the mock processor instead of the hosted API
    #[arg(long, env = "USE_MOCK_API")]
    mock: bool,

    /// Register URL as the processor's webhook endpoint and exit
    #[arg(long, value_name = "URL")]
    register_webhook: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting payflow-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let overrides = CliOverrides {
        listen: args.listen,
        mock_mode: args.mock.then_some(true),
    };
    let config = ConfigLoader::new(&args.config, overrides)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    let mock_mode = config.mock_mode();
    tracing::info!(mock_mode, processor = ?config.processor, "Configuration loaded from {:?}", args.config);

    let client = build_client(&config.processor, config.request_timeout).map_err(|e| {
        tracing::error!("Failed to build processor client: {}", e);
        e
    })?;

    if let Some(url) = &args.register_webhook {
        let webhook = register::register_webhook(&client, url).await.map_err(|e| {
            tracing::error!("Failed to register webhook: {}", e);
            e
        })?;
        tracing::info!(id = %webhook.id, subscriptions = ?webhook.subscriptions, "Done");
        return Ok(());
    }

    // Resolve the event signing key before accepting any traffic
    let origin = EventOrigin::from_mock_flag(mock_mode);
    let verifier = Arc::new(EcdsaEventVerifier::new().with_source(origin, Arc::new(client.clone())));
    match verifier.refresh(origin).await {
        Ok(_) => tracing::info!(%origin, "Event signing key loaded"),
        Err(e) if mock_mode => {
            tracing::warn!(%origin, error = %e, "Mock signing key unavailable, will retry on first event");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch the processor public key");
            return Err(e.into());
        }
    }

    // Create database connection pool and bring the schema up to date
    tracing::info!("Connecting to database...");
    let db_pool = connect_and_migrate(&config.database.url, config.database.max_connections)
        .await
        .map_err(|e| {
            tracing::error!("Failed to prepare database: {}", e);
            e
        })?;
    tracing::info!("Database ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue_tx, queue_rx) = event_queue();
    let (scheduler_history, scheduler_runs) = history(HISTORY_CAPACITY);
    let (webhook_history, webhook_events) = history(HISTORY_CAPACITY);
    let counters = Arc::new(WebhookCounters::default());
    let gateway = Arc::new(client);

    let settlement = Arc::new(SettlementForwarder::new(
        db_pool.clone(),
        gateway.clone(),
        config.destination.clone(),
    ));

    let event_processor = EventProcessor::new(
        queue_rx,
        verifier,
        settlement.clone(),
        webhook_history,
        counters.clone(),
        shutdown_rx.clone(),
    );
    let processor_task = tokio::spawn(event_processor.run());

    let reconciler = Reconciler::new(
        db_pool.clone(),
        gateway.clone(),
        settlement,
        config.reconciliation,
        shutdown_rx.clone(),
    );
    let reconciler_task = tokio::spawn(reconciler.run());

    let emitter = Arc::new(BatchEmitter::new(
        db_pool.clone(),
        gateway,
        Arc::new(RandomPayers),
        config.batch.clone(),
    ));
    let scheduler = EmissionScheduler::new(emitter, scheduler_history, config.schedule);
    let scheduler_state = scheduler.state();
    let scheduler_handle = scheduler.start();

    let (resources, sampler_task) = resources::spawn_sampler(shutdown_rx);

    // Create application state
    let state = AppState {
        db: db_pool.clone(),
        queue: queue_tx,
        mock_mode,
        counters,
        scheduler_runs,
        webhook_events,
        scheduler_state,
        resources,
        started_at: Instant::now(),
    };

    // Run the server
    let router = build_router(state);
    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(router, config.listen).await;

    // Stop background tasks
    shutdown_tx.send_replace(true);
    scheduler_handle.shutdown();
    if let Err(e) = scheduler_handle.join().await {
        tracing::error!("EmissionScheduler task failed: {}", e);
    }
    join_task("EventProcessor", processor_task).await;
    join_task("Reconciler", reconciler_task).await;
    join_task("Resource sampler", sampler_task).await;

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

fn build_client(
    settings: &ProcessorSettings,
    request_timeout: Duration,
) -> anyhow::Result<ProcessorClient> {
    let client = match settings {
        ProcessorSettings::Mock { base_url } => ProcessorClient::new(base_url.clone()),
        ProcessorSettings::Real {
            environment,
            project_id,
            private_key_pem,
        } => {
            let credentials = Credentials::from_pem(project_id.clone(), private_key_pem)?;
            ProcessorClient::for_environment(*environment, credentials)?
        }
    };
    Ok(client.with_timeout(request_timeout)?)
}

async fn join_task(name: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        tracing::error!("{} task failed: {}", name, e);
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
