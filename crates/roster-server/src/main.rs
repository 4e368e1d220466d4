//! Roster Server
//!
//! A small CRUD service for user records: JSON REST API under /api, a
//! PostgreSQL storage backend with an in-memory fallback, and a static
//! browser dashboard.

mod error;
mod handlers;
mod models;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use services::UserService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Roster Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    let config = load_config().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, static_dir={}",
        config.bind_address, config.static_dir
    );

    // Select the storage backend once for the process lifetime
    let store = storage::connect(config.database_url.as_deref()).await;
    info!("Active storage backend: {}", store.kind());

    let state = AppState {
        users: Arc::new(UserService::new(store.clone())),
    };

    // Build router
    info!("Building HTTP router...");
    let index_path = PathBuf::from(&config.static_dir).join("index.html");

    let app = Router::new()
        // REST API routes
        .nest("/api", api_routes())
        // Dashboard
        .fallback_service(
            ServeDir::new(&config.static_dir).not_found_service(ServeFile::new(index_path)),
        )
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release database connections before exiting
    store.close().await;
    info!("Shutdown complete");

    Ok(())
}

pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route(
            "/users/:id",
            get(handlers::users::get)
                .put(handlers::users::update)
                .delete(handlers::users::delete),
        )
        .fallback(handlers::not_found)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[derive(Debug, Clone)]
struct Config {
    bind_address: String,
    database_url: Option<String>,
    static_dir: String,
}

fn load_config() -> Result<Config> {
    let port: u16 = match std::env::var("PORT") {
        Ok(v) => v.parse().context("Invalid PORT value")?,
        Err(_) => 3000,
    };
    let bind_address = format!("0.0.0.0:{}", port);

    let database_url = std::env::var("DATABASE_URL").ok();

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());

    Ok(Config {
        bind_address,
        database_url,
        static_dir,
    })
}
