//! Documentation of the retreat voting platform backend.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server over JSON, nothing is rendered here
//! - Server talks to Redis by its internal container name
//! - Browsers are told apart by a UUID v4 in the `user_id` cookie, there are no accounts
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/session` | current user id, issues the cookie on first visit |
//! | GET | `/dashboard` | every category with item/vote totals and its top 5 items |
//! | GET | `/categories` | categories in creation order |
//! | POST | `/categories` | add a category |
//! | GET | `/categories/{id}` | items with counts, the caller's vote, previous/next category |
//! | POST | `/items` | add an item |
//! | POST | `/votes` | submit or change the caller's vote in a category |
//!
//!
//!
//! # Notes
//!
//! ## One vote per category
//! The vote engine decides between insert, update and no-op from the caller's current vote.
//! `/votes` reads that vote from the store instead of trusting the one the client sends, and
//! the store refuses a second vote in a category regardless.
//!
//! ## Dashboard
//! Two interchangeable strategies, picked with `DASHBOARD_STRATEGY`:
//! - `client`: three reads in parallel, counting done here
//! - `remote`: Redis groups and counts in a Lua script, we only rebuild the shape
//!
//! Both yield identical results for identical data.
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://localhost:6379 RUST_LOG=info cargo run -p retreat
//! ```
//!
//! Run without Redis, nothing persisted.
//! ```sh
//! STORE_BACKEND=memory RUST_LOG=info cargo run -p retreat
//! ```
//!
//! Seed categories and items.
//! ```sh
//! cargo run -p seed -- seed.json --redis-url redis://localhost:6379
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod identity;
pub mod memory;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
pub mod votes;

#[cfg(test)]
mod testing;

use config::Config;
use error::ServerError;
use routes::{
    categories_handler, category_handler, create_category_handler, create_item_handler,
    dashboard_handler, session_handler, votes_handler,
};
use state::State;

pub async fn start_server() -> Result<(), ServerError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.frontend_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/session", get(session_handler))
        .route("/dashboard", get(dashboard_handler))
        .route(
            "/categories",
            get(categories_handler).post(create_category_handler),
        )
        .route("/categories/{id}", get(category_handler))
        .route("/items", post(create_item_handler))
        .route("/votes", post(votes_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
