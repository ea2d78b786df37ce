//! Shared fixture: a real HTTP service with scripted responses and hit
//! counters, bound to an ephemeral port on localhost so the prober's
//! candidate walk reaches it first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use fleetpulse_health::MonitorConfig;
use fleetpulse_registry::ServiceRecord;

/// A scripted response for one fixture route.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: String::new(),
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html".to_string(),
            body: body.to_string(),
        }
    }

    pub fn text(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/plain".to_string(),
            body: body.to_string(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

#[derive(Clone)]
struct FixtureState {
    health: Reply,
    example: Reply,
    health_hits: Arc<AtomicUsize>,
    example_hits: Arc<AtomicUsize>,
}

/// A running fixture service.
pub struct FixtureService {
    pub port: u16,
    pub health_hits: Arc<AtomicUsize>,
    pub example_hits: Arc<AtomicUsize>,
}

impl FixtureService {
    pub fn total_hits(&self) -> usize {
        self.health_hits.load(Ordering::SeqCst) + self.example_hits.load(Ordering::SeqCst)
    }
}

async fn health_route(State(state): State<FixtureState>) -> Reply {
    state.health_hits.fetch_add(1, Ordering::SeqCst);
    state.health.clone()
}

async fn example_route(State(state): State<FixtureState>) -> Reply {
    state.example_hits.fetch_add(1, Ordering::SeqCst);
    state.example.clone()
}

/// Spawn a fixture serving `/health` and `/example` with the given scripts.
pub async fn spawn_fixture(health: Reply, example: Reply) -> FixtureService {
    let health_hits = Arc::new(AtomicUsize::new(0));
    let example_hits = Arc::new(AtomicUsize::new(0));
    let state = FixtureState {
        health,
        example,
        health_hits: Arc::clone(&health_hits),
        example_hits: Arc::clone(&example_hits),
    };

    let app = Router::new()
        .route("/health", get(health_route))
        .route("/example", get(example_route))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FixtureService {
        port,
        health_hits,
        example_hits,
    }
}

/// An ephemeral port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// A record whose internal candidates resolve to the fixture.
pub fn fixture_record(id: &str, port: u16, with_example: bool) -> ServiceRecord {
    ServiceRecord {
        id: id.to_string(),
        name: id.to_string(),
        port,
        example_url: if with_example {
            format!("http://127.0.0.1:{port}/example")
        } else {
            String::new()
        },
        ..Default::default()
    }
}

/// Production semantics with test-speed timings.
pub fn fast_config() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_secs(3600),
        workers: 4,
        attempts: 3,
        backoff: vec![Duration::ZERO, Duration::ZERO],
        probe_timeout: Duration::from_secs(2),
        test_timeout: Duration::from_secs(2),
        circuit_threshold: 5,
        circuit_cooldown: Duration::from_secs(300),
    }
}
