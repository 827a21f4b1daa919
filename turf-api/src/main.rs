use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use turf_api::{app, state::AppState, worker};
use turf_core::memory::{InMemoryCatalog, InMemoryDirectory, InMemoryHoldStore, InMemoryLedger};
use turf_core::notify::{LogNotifier, Notifier};
use turf_reservation::{Backends, ReservationRules, ReservationService};
use turf_store::app_config::{Config, StorageBackend};
use turf_store::{DbClient, PgBookingLedger, PgDirectory, PgSlotCatalog, RedisHoldStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turf_api=debug,turf_reservation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Turf API on port {}", config.server.port);

    let rules = ReservationRules::new(
        config.business_rules.hold_ttl_seconds,
        config.business_rules.utc_offset_minutes,
    )
    .context("Invalid business rules")?;

    let backends = match config.storage.backend {
        StorageBackend::Postgres => durable_backends(&config).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; bookings are lost on restart");
            Backends {
                catalog: Arc::new(InMemoryCatalog::new()),
                ledger: Arc::new(InMemoryLedger::new()),
                holds: Arc::new(InMemoryHoldStore::new()),
                directory: Arc::new(InMemoryDirectory::new()),
                notifier: Arc::new(LogNotifier),
            }
        }
    };

    let reservations = Arc::new(ReservationService::new(backends, rules));
    let app_state = AppState::new(reservations.clone(), config.auth.jwt_secret.clone())
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    worker::start_hold_sweeper(
        reservations,
        app_state.metrics.clone(),
        config.business_rules.hold_sweep_seconds,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn durable_backends(config: &Config) -> anyhow::Result<Backends> {
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let holds = RedisHoldStore::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    Ok(Backends {
        catalog: Arc::new(PgSlotCatalog::new(db.pool.clone())),
        ledger: Arc::new(PgBookingLedger::new(db.pool.clone())),
        holds: Arc::new(holds),
        directory: Arc::new(PgDirectory::new(db.pool.clone())),
        notifier: owner_notifier(config)?,
    })
}

#[cfg(feature = "kafka")]
fn owner_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.kafka.brokers.is_empty() {
        return Ok(Arc::new(LogNotifier));
    }
    let producer = turf_store::EventProducer::new(&config.kafka.brokers).context("Failed to create Kafka producer")?;
    Ok(Arc::new(turf_store::KafkaNotifier::new(producer, config.kafka.topic.clone())))
}

#[cfg(not(feature = "kafka"))]
fn owner_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    if !config.kafka.brokers.is_empty() {
        tracing::warn!("Kafka brokers configured but built without the `kafka` feature; owner notices go to the log");
    }
    Ok(Arc::new(LogNotifier))
}
