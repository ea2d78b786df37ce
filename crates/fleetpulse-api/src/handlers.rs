//! REST API handlers.
//!
//! Each handler snapshots state through the registry or drives the monitor,
//! and returns bare JSON in the shapes the dashboard consumes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::info;

use fleetpulse_registry::{ServiceStatus, TestStatus};

use crate::{AppState, SERVICE_NAME, SERVICE_VERSION};

/// The fleet's fixed category set.
pub const CATEGORIES: [&str; 5] = [
    "domains",
    "security",
    "recon",
    "infrastructure",
    "web_analysis",
];

fn not_found(msg: &str) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": msg })),
    )
}

// ── Fleet state ────────────────────────────────────────────────

/// GET /api/services
pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.get_all().await)
}

#[derive(Serialize)]
struct StatsResponse {
    total: usize,
    healthy: usize,
    unhealthy: usize,
    healthy_percent: f64,
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let services = state.registry.get_all().await;
    let total = services.len();
    let healthy = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Healthy)
        .count();
    let unhealthy = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Unhealthy)
        .count();

    let healthy_percent = if total > 0 {
        healthy as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Json(StatsResponse {
        total,
        healthy,
        unhealthy,
        healthy_percent,
    })
}

/// GET /api/categories
pub async fn categories() -> impl IntoResponse {
    Json(CATEGORIES)
}

// ── Operator actions ───────────────────────────────────────────

#[derive(Serialize)]
struct TestResponse {
    id: String,
    test_status: TestStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    test_error: String,
}

/// POST /api/test/{id}
pub async fn run_test(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.monitor.run_test(&id).await {
        Some(result) => Json(TestResponse {
            id,
            test_status: result.status,
            test_error: result.error,
        })
        .into_response(),
        None => not_found("service not found").into_response(),
    }
}

#[derive(Serialize)]
struct CategoryTestResponse {
    category: String,
    tested: usize,
    passed: usize,
}

/// POST /api/test-category/{category}
pub async fn test_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    let services = state.registry.get_all().await;
    let mut tested = 0;
    let mut passed = 0;

    for service in services.iter().filter(|s| s.category == category) {
        if let Some(result) = state.monitor.run_test(&service.id).await {
            tested += 1;
            if result.status == TestStatus::Passing {
                passed += 1;
            }
        }
    }

    info!(%category, tested, passed, "category test completed");
    Json(CategoryTestResponse {
        category,
        tested,
        passed,
    })
}

/// POST /api/refresh
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    // Fire the cycle in the background; reply with the counts as they are.
    let monitor = state.monitor.clone();
    tokio::spawn(async move {
        monitor.check_all().await;
    });

    let services = state.registry.get_all().await;
    let total = services.len();
    let healthy = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Healthy)
        .count();

    Json(serde_json::json!({
        "message": "Refresh triggered",
        "total": total,
        "healthy": healthy,
        "unhealthy": total - healthy,
    }))
}

/// GET /api/compliance/{id}
pub async fn compliance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.monitor.run_compliance(&id).await {
        Some(report) => Json(report).into_response(),
        None => not_found("service not found").into_response(),
    }
}

// ── Self-reporting ─────────────────────────────────────────────

/// GET /health
pub async fn self_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
    }))
}

/// GET /version
pub async fn self_version() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
    }))
}
