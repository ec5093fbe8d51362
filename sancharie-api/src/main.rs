use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sancharie_api::state::{AppState, AuthConfig, Backends, ThrottlePolicy};
use sancharie_api::unconfigured::Unconfigured;
use sancharie_api::{app, cors_layer};
use sancharie_core::inventory::InventoryProvider;
use sancharie_core::memory::{MemoryBookingRepository, MemoryExpiringStore, MemoryUserRepository};
use sancharie_core::otp::{OtpService, SmsGateway};
use sancharie_core::payment::PaymentGateway;
use sancharie_core::repository::{BookingRepository, UserRepository};
use sancharie_core::ExpiringStore;
use sancharie_gateway::{HttpInventoryProvider, MetaReachSms, RazorpayGateway};
use sancharie_order::{spawn_sweeper, CheckoutOrchestrator, SessionManager};
use sancharie_store::{
    DbClient, PgBookingRepository, PgUserRepository, RedisExpiringStore, Settings, StorageBackend,
};

const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

struct Storage {
    users: Arc<dyn UserRepository>,
    bookings: Arc<dyn BookingRepository>,
    store: Arc<dyn ExpiringStore>,
    backends: Backends,
}

async fn connect_storage(settings: &Settings) -> anyhow::Result<Storage> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts and bookings are lost on restart");
            let store = MemoryExpiringStore::new();
            let purger = store.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(MEMORY_PURGE_INTERVAL);
                loop {
                    ticker.tick().await;
                    let purged = purger.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired entries");
                    }
                }
            });
            Ok(Storage {
                users: Arc::new(MemoryUserRepository::new()),
                bookings: Arc::new(MemoryBookingRepository::new()),
                store: Arc::new(store),
                backends: Backends::default(),
            })
        }
        StorageBackend::Persistent => {
            let db = DbClient::new(&settings.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            let redis = RedisExpiringStore::new(&settings.redis.url)
                .await
                .context("Failed to connect to Redis")?;
            Ok(Storage {
                users: Arc::new(PgUserRepository::new(db.pool.clone())),
                bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
                store: Arc::new(redis.clone()),
                backends: Backends {
                    db: Some(db),
                    redis: Some(redis),
                },
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sancharie_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("Failed to load config")?;
    tracing::info!("Starting Sancharie API on port {}", settings.server.port);

    let storage = connect_storage(&settings).await?;

    let inventory: Arc<dyn InventoryProvider> = match HttpInventoryProvider::new(settings.inventory.clone()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "Bus search and booking disabled");
            Arc::new(Unconfigured("Inventory API"))
        }
    };
    let sms: Arc<dyn SmsGateway> = match MetaReachSms::new(settings.sms.clone()) {
        Ok(sms) => Arc::new(sms),
        Err(e) => {
            tracing::warn!(error = %e, "OTP delivery disabled");
            Arc::new(Unconfigured("SMS gateway"))
        }
    };
    let payments: Arc<dyn PaymentGateway> = match RazorpayGateway::new(settings.payment.clone()) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::warn!(error = %e, "Payments disabled");
            Arc::new(Unconfigured("Razorpay"))
        }
    };

    let sessions = Arc::new(Mutex::new(SessionManager::new(settings.session.idle_ttl())));
    spawn_sweeper(sessions.clone(), settings.session.sweep_interval());

    let checkout = CheckoutOrchestrator::new(inventory.clone(), payments, storage.bookings.clone(), sessions)
        .with_fare(settings.fare.fare_config())
        .with_normalizer(settings.fare.normalizer_options());

    let app_state = AppState {
        users: storage.users,
        bookings: storage.bookings,
        inventory,
        otp: Arc::new(OtpService::new(storage.store.clone(), sms, settings.otp.clone())),
        checkout: Arc::new(checkout),
        counters: storage.store,
        throttle: ThrottlePolicy {
            max_requests: settings.throttle.max_requests,
            window: settings.throttle.window(),
        },
        auth: AuthConfig {
            secret: settings.auth.jwt_secret.clone(),
            expiration: settings.auth.jwt_expiration_seconds,
        },
        backends: storage.backends,
    };

    let app = app(app_state, cors_layer(&settings.server.allowed_origins));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
