use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyara_api::{app, state::AuthConfig, AppState};
use voyara_booking::{BookingLifecycleManager, PaymentIntentCoordinator, PaymentWebhookProcessor};
use voyara_core::lock::LockManager;
use voyara_core::notify::LogNotifier;
use voyara_core::payment::MockPaymentGateway;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyara_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = voyara_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Voyara API on port {}", config.server.port);

    let db = voyara_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let locks: Arc<dyn LockManager> = match config.redis.url.as_deref() {
        Some(url) if !url.is_empty() => {
            let manager =
                voyara_store::RedisLockManager::new(url).expect("Failed to connect to Redis");
            Arc::new(manager)
        }
        _ => {
            tracing::warn!("No Redis configured; falling back to in-process locks");
            Arc::new(voyara_store::MemoryLockManager::new())
        }
    };

    let store = Arc::new(voyara_store::PgBookingStore::new(db.pool.clone()));
    let flights = Arc::new(voyara_store::PgFlightLookup::new(db.pool.clone()));
    let gateway = Arc::new(MockPaymentGateway);

    let lifecycle = Arc::new(BookingLifecycleManager::new(
        store.clone(),
        flights,
        config.validation.clone(),
    ));
    let payments = Arc::new(PaymentIntentCoordinator::new(
        store.clone(),
        gateway,
        locks,
        lifecycle.clone(),
        Duration::from_millis(config.payment.gateway_timeout_ms),
    ));
    let webhooks = Arc::new(PaymentWebhookProcessor::new(
        store,
        lifecycle.clone(),
        Arc::new(LogNotifier),
        config.payment.webhook_secret.clone(),
    ));

    let app_state = AppState {
        lifecycle,
        payments,
        webhooks,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
