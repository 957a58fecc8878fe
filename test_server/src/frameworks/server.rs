// Framework bootstrap for the test server runtime.

use crate::domain::{Clock, GuestStore, TestCatalog};
use crate::frameworks::{config, db};
use crate::interface_adapters::catalog::{InMemoryTestCatalog, PostgresTestCatalog};
use crate::interface_adapters::clients::auth::AuthClient;
use crate::interface_adapters::guest_store::InMemoryGuestStore;
use crate::interface_adapters::routes;
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::{GuestLocks, GuestStorageUseCase};

use std::net::SocketAddr;
use std::{io::Result, sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;

fn init_runtime() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    spawn_guest_sweeper(
        GuestStorageUseCase {
            clock: state.clock.clone(),
            store: state.guests.clone(),
            locks: state.guest_locks.clone(),
            ttl_millis: state.guest_ttl_millis,
        },
        config::guest_sweep_interval(),
    );

    let app = routes::app(state);
    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling.
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let auth_verify_timeout = config::auth_verify_timeout();
    let auth_client = AuthClient::new(config::auth_service_url(), auth_verify_timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize auth client: {e}")))?;
    tracing::debug!(
        auth_base_url = %auth_client.base_url(),
        auth_verify_timeout_ms = auth_verify_timeout.as_millis(),
        "auth client configured"
    );

    let catalog = build_catalog().await?;

    let guest_ttl = config::guest_ttl();
    let quota_bytes = config::guest_storage_quota_bytes();
    tracing::debug!(
        guest_ttl_secs = guest_ttl.as_secs(),
        quota_bytes,
        "guest storage configured"
    );
    let guests: Arc<dyn GuestStore> = Arc::new(InMemoryGuestStore::new(quota_bytes));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Ok(Arc::new(AppState {
        catalog,
        users: Arc::new(auth_client),
        guests,
        clock,
        guest_locks: GuestLocks::default(),
        guest_ttl_millis: u64::try_from(guest_ttl.as_millis()).unwrap_or(u64::MAX),
    }))
}

async fn build_catalog() -> Result<Arc<dyn TestCatalog>> {
    if let Some(database_url) = config::database_url() {
        let db = db::connect_pool(&database_url).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to database");
            std::io::Error::other(e)
        })?;
        db::run_migrations(&db).await.map_err(|e| {
            tracing::error!(error = %e, "failed to run migrations");
            std::io::Error::other(e)
        })?;
        tracing::info!("serving catalog from postgres");
        return Ok(Arc::new(PostgresTestCatalog { db }));
    }

    let path = config::catalog_path();
    let catalog = InMemoryTestCatalog::load(&path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to load catalog");
        std::io::Error::other(e)
    })?;
    tracing::info!(path = %path.display(), tests = catalog.len(), "serving catalog from seed file");
    Ok(Arc::new(catalog))
}

// Periodically purge expired guests so abandoned buckets do not pile up.
fn spawn_guest_sweeper(
    guests: GuestStorageUseCase<Arc<dyn Clock>, Arc<dyn GuestStore>>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match guests.sweep_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired guests swept"),
                Err(err) => tracing::warn!(error = %err, "guest sweep failed"),
            }
        }
    });
}
