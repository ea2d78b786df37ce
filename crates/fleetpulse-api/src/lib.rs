//! fleetpulse-api — REST API and event stream.
//!
//! Provides axum route handlers over the registry and monitor.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/services` | Full records, sorted by name |
//! | GET | `/api/stats` | Aggregate health counts |
//! | GET | `/api/categories` | Fixed category names |
//! | POST | `/api/test/{id}` | Run an active link test |
//! | POST | `/api/test-category/{category}` | Test every service in a category |
//! | POST | `/api/refresh` | Kick off a fleet check |
//! | GET | `/api/events` | Server-sent update stream |
//! | GET | `/api/compliance/{id}` | Conformance scan |
//! | GET | `/health` | The monitor's own liveness |
//! | GET | `/version` | The monitor's own version |

pub mod events;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use fleetpulse_health::Monitor;
use fleetpulse_registry::Registry;

/// What the process reports about itself on `/health` and `/version`.
pub const SERVICE_NAME: &str = "fleetpulse";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub monitor: Arc<Monitor>,
}

/// Build the complete API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/services", get(handlers::list_services))
        .route("/api/stats", get(handlers::stats))
        .route("/api/categories", get(handlers::categories))
        .route("/api/test/{id}", post(handlers::run_test))
        .route("/api/test-category/{category}", post(handlers::test_category))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/events", get(events::stream_events))
        .route("/api/compliance/{id}", get(handlers::compliance))
        .route("/health", get(handlers::self_health))
        .route("/version", get(handlers::self_version))
        .with_state(state)
}
