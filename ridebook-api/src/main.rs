use anyhow::Context;
use ridebook_api::{app, AppState};
use ridebook_core::{BookingRepository, NotificationDispatcher, PaymentProcessor, VehicleCatalog};
use ridebook_infra::app_config::{Config, ProcessorMode};
use ridebook_infra::{
    DbClient, HttpCheckoutProcessor, InMemoryBookingStore, LogNotifier, PgBookingRepository, PgVehicleCatalog,
    SandboxProcessor, StaticCatalog, WebhookVerifier,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridebook_api=debug,ridebook_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    let pricing = config.pricing.to_pricing_config().context("Invalid pricing config")?;
    tracing::info!("Starting Ridebook API on port {}", config.server.port);

    let (catalog, repo): (Arc<dyn VehicleCatalog>, Arc<dyn BookingRepository>) = match &config.database {
        Some(db) => {
            let client = DbClient::new(&db.url, db.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            client.migrate().await.context("Failed to run migrations")?;

            let catalog = PgVehicleCatalog::new(client.pool.clone());
            if !config.vehicles.is_empty() {
                catalog.seed(&config.vehicles).await.context("Failed to seed vehicles")?;
            }
            (Arc::new(catalog), Arc::new(PgBookingRepository::new(client.pool.clone())))
        }
        None => {
            tracing::warn!("No database configured; bookings are kept in memory");
            (
                Arc::new(StaticCatalog::new(config.vehicles.clone())),
                Arc::new(InMemoryBookingStore::new()),
            )
        }
    };

    let processor: Arc<dyn PaymentProcessor> = match config.processor.mode {
        ProcessorMode::Http => Arc::new(
            HttpCheckoutProcessor::new(&config.processor).context("Failed to build payment processor client")?,
        ),
        ProcessorMode::Sandbox => {
            tracing::warn!("Using sandbox payment processor");
            Arc::new(SandboxProcessor::new(
                format!("http://localhost:{}/sandbox/checkout", config.server.port),
                config.processor.webhook_secret.clone(),
            ))
        }
    };

    let notifier = build_notifier(&config)?;

    let state = AppState::new(
        catalog,
        repo,
        processor,
        notifier,
        pricing,
        WebhookVerifier::new(
            config.processor.webhook_secret.clone(),
            config.processor.webhook_tolerance_seconds,
        ),
        config.pricing.deposit_percent,
    );

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "kafka")]
fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn NotificationDispatcher>> {
    match &config.kafka {
        Some(kafka) => {
            let notifier = ridebook_infra::KafkaNotifier::new(&kafka.brokers, &kafka.topic)
                .context("Failed to create Kafka producer")?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(not(feature = "kafka"))]
fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn NotificationDispatcher>> {
    if config.kafka.is_some() {
        tracing::warn!("Kafka configured but this build has no kafka support; logging notifications instead");
    }
    Ok(Arc::new(LogNotifier))
}
