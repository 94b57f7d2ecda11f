use anyhow::Context;
use eventeq_api::metrics::Metrics;
use eventeq_api::stream::ConnectionRegistry;
use eventeq_api::{app, worker, AppState};
use eventeq_booking::{BookingService, SystemClock};
use eventeq_core::identity::UserDirectory;
use eventeq_core::notify::FanoutNotifier;
use eventeq_store::app_config::Config;
use eventeq_store::{
    DbClient, PgBookingRepository, PgItemCatalog, PgUserDirectory, RedisClient, SmtpNotifier, ToyyibPayGateway,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "eventeq_api=debug,eventeq_booking=debug,eventeq_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting EventEQ API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(db.pool.clone()));
    let gateway = ToyyibPayGateway::new(config.payment.clone()).context("Failed to build payment gateway client")?;

    // Redis (rate limiting only)
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).context("Invalid Redis URL")?,
        )),
        None => {
            tracing::warn!("No Redis configured, rate limiting disabled");
            None
        }
    };

    // Notification fan-out: live streams, metrics, then optional mail and Kafka
    let registry = Arc::new(ConnectionRegistry::new());
    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let mut notifier = FanoutNotifier::new()
        .with(registry.clone())
        .with(metrics.clone());

    if let Some(smtp) = &config.smtp {
        let mailer = SmtpNotifier::new(smtp, users.clone()).context("Failed to build SMTP transport")?;
        notifier = notifier.with(Arc::new(mailer));
        tracing::info!("Booking emails enabled via {}", smtp.host);
    }

    #[cfg(feature = "kafka")]
    if let Some(kafka) = &config.kafka {
        let producer = eventeq_store::EventProducer::new(&kafka.brokers, &kafka.topic)
            .context("Failed to create Kafka producer")?;
        notifier = notifier.with(Arc::new(producer));
        tracing::info!("Publishing booking events to Kafka topic {}", kafka.topic);
    }
    #[cfg(not(feature = "kafka"))]
    if config.kafka.is_some() {
        tracing::warn!("Kafka configured but this build lacks the `kafka` feature, events stay local");
    }

    let service = Arc::new(BookingService::new(
        Arc::new(PgBookingRepository::new(db.pool.clone())),
        Arc::new(gateway),
        users,
        Arc::new(PgItemCatalog::new(db.pool.clone())),
        Arc::new(notifier),
        Arc::new(SystemClock),
        config.service_config(),
    ));

    if let Some(seconds) = config.lifecycle.refresh_interval_seconds.filter(|s| *s > 0) {
        tokio::spawn(worker::start_refresh_worker(service.clone(), Duration::from_secs(seconds)));
    }

    let app_state = AppState {
        service,
        db: Some(db),
        redis,
        registry,
        metrics,
        rate_limit: config.rate_limit.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;
    Ok(())
}
