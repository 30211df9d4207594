use std::net::SocketAddr;
use std::sync::Arc;

use krossfire_core::generator::QuestionGenerator;
use krossfire_core::storage::Storage;
use krossfire_db::memory::MemoryStorage;
use krossfire_db::pg::PgStorage;
use krossfire_generator::{FakeGenerator, GeminiClient, GeminiConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use krossfire_api::config::ServerConfig;
use krossfire_api::router::build_app_router;
use krossfire_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "krossfire_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let storage: Arc<dyn Storage> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = krossfire_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            krossfire_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            krossfire_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgStorage::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is not persisted)");
            Arc::new(MemoryStorage::new())
        }
    };

    // --- Question generator ---
    let generator: Arc<dyn QuestionGenerator> = match config.gemini_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Using Gemini question generator");
            Arc::new(GeminiClient::new(GeminiConfig::new(api_key)))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, using synthetic question generator");
            Arc::new(FakeGenerator::default())
        }
    };

    // --- App state and router ---
    let state = AppState::new(storage, generator, config.clone());
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
