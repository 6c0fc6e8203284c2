/// Bookworm Identity Service Main Entry Point
///
/// Starts the HTTP server with:
/// - PostgreSQL connection pool (user store)
/// - Process-local OTP store (with background expiry sweep)
/// - Session token issuer (JWT)
use anyhow::{Context, Result};
use bookworm_identity::{
    config::Settings,
    db::PgUserRepository,
    http::{build_router, AppState},
    security::TokenIssuer,
    services::{OtpStore, OTP_TTL},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

/// Interval between sweeps of expired OTP entries
const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "bookworm_identity=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Bookworm identity service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize the token issuer; a missing or empty signing key is a
    // fatal configuration error, surfaced here rather than per request
    let tokens = Arc::new(TokenIssuer::from_settings(&settings.jwt)?);
    info!("Session token issuer initialized");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // OTP store lives for the process lifetime; pending codes do not
    // survive a restart, which just forces a re-request
    let otp_store = Arc::new(OtpStore::new(OTP_TTL));

    // Background sweep bounds retention of abandoned entries
    let sweep_store = otp_store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(OTP_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweep_store.sweep_expired();
        }
    });

    let repo = Arc::new(PgUserRepository::new(db_pool));
    let state = AppState::new(repo, otp_store, tokens);
    let app = build_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Identity service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
