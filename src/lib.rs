//! Documentation of the quality-assurance portal backend.
//!
//! One process hosts two loosely related admin subsystems sharing a MongoDB
//! deployment and a session cookie:
//!
//! - **Video/links dashboard**: departments, video entries, ordered shareable
//!   links, per-section password gating, and JSON backups of those collections.
//! - **Committee evaluation system**: colleges, a committee-name dictionary,
//!   auditors, evaluation score documents, file-link records, per-user
//!   committee assignments, display settings, and an append-only audit log,
//!   gated by session-based role auth (`admin` / `user` / `subuser-member`).
//!
//!
//!
//! # Sessions
//!
//! One cookie, two namespaces:
//! - `section:<name>` boolean flags unlock video-dashboard sections after a
//!   shared section password check
//! - `user` holds the logged-in committee user (id, name, email, username, role)
//!
//! Expiry is inactivity-based, 60 minutes by default.
//!
//!
//!
//! # Environment
//!
//! | Variable              | Default                      |
//! |-----------------------|------------------------------|
//! | `PORT`                | `3000`                       |
//! | `MONGO_URI`           | `mongodb://localhost:27017`  |
//! | `MONGO_DB`            | `qa-portal`                  |
//! | `SESSION_TTL_MINUTES` | `60`                         |
//! | `CORS_ORIGIN`         | unset (any origin, no creds) |
//!
//!
//!
//! # Setup
//!
//! Run the server.
//! ```sh
//! MONGO_URI=mongodb://localhost:27017 cargo run
//! ```
//!
//! Seed the first admin account (guarded, see `seed-admin`).
//! ```sh
//! RUN_SEED=1 ADMIN_NAME=... ADMIN_USERNAME=... ADMIN_EMAIL=... ADMIN_PASSWORD=... \
//!     cargo run --bin seed-admin
//! ```
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    Router,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use time::Duration as SessionDuration;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod audit;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Ensuring indexes...");
    database::ensure_indexes(&state.db)
        .await
        .expect("Failed to create indexes");

    info!("Starting server...");

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(SessionDuration::minutes(
            state.config.session_ttl_minutes,
        )));

    let app = Router::new()
        .merge(routes::router())
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .layer(session_layer)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    // Credentialed CORS needs an explicit origin, the wildcard is rejected by
    // browsers when cookies are involved.
    match origin {
        Some(origin) => cors
            .allow_origin(origin.parse::<HeaderValue>().expect("Invalid CORS_ORIGIN"))
            .allow_credentials(true),
        None => cors.allow_origin(Any),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
