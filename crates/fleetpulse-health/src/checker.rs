//! The two-signal check engine.
//!
//! Combines a liveness probe (`/health`, internal first, public fallback)
//! with a functional probe of the record's example URL (public first,
//! internal fallback) and synthesizes the tri-state verdict. The engine is
//! pure: it consumes a record snapshot and returns a [`CheckResult`]; the
//! monitor owns the write-back.

use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::debug;

use fleetpulse_registry::{ServiceRecord, ServiceStatus, SignalStatus};

use crate::prober::{self, HealthPayload};

/// Everything one check produced, ready for the monitor's write-back.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub status: ServiceStatus,
    pub health_status: SignalStatus,
    pub example_status: SignalStatus,
    pub last_error: String,
    pub version: String,
    pub response_ms: u64,
    /// Internal target that answered the liveness probe, if any.
    pub resolved_host: Option<String>,
    pub resolved_port: Option<u16>,
}

/// Join two diagnostics with ` | `, tolerating an empty left side.
fn join_diag(left: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else {
        format!("{left} | {right}")
    }
}

/// Run both probe signals against a service and synthesize the verdict.
pub async fn check_service(client: &Client, record: &ServiceRecord) -> CheckResult {
    let start = Instant::now();

    let mut health_ok = false;
    let mut example_ok = false;
    let mut version = String::new();
    let mut health_error = String::new();
    let mut example_error = String::new();
    let mut resolved_host = None;
    let mut resolved_port = None;

    // Step 1: liveness via the internal candidates.
    let mut try_public_health = false;
    match prober::try_internal(client, record, "/health").await {
        Ok(hit) if hit.response.status() == StatusCode::OK => {
            // An answering 200 refines the cached target even when the
            // payload disqualifies it below.
            resolved_host = Some(hit.host);
            resolved_port = Some(hit.port);
            let body = hit.response.bytes().await.unwrap_or_default();
            match serde_json::from_slice::<HealthPayload>(&body) {
                Ok(payload) if payload.is_healthy() => {
                    health_ok = true;
                    version = payload.version;
                }
                Ok(payload) => {
                    health_error = format!("Internal health status: {}", payload.status);
                }
                // 200 without a JSON body still counts as alive (plain-text
                // health endpoints are grandfathered in).
                Err(_) => health_ok = true,
            }
        }
        Ok(hit) => {
            health_error = format!("Internal health: HTTP {}", hit.response.status().as_u16());
            try_public_health = true;
        }
        Err(err) => {
            health_error = format!("Internal health: {err}");
            try_public_health = true;
        }
    }

    // Public fallback, same rules as the internal attempt.
    if try_public_health && !record.health_url.is_empty() {
        match client.get(&record.health_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                let body = response.bytes().await.unwrap_or_default();
                match serde_json::from_slice::<HealthPayload>(&body) {
                    Ok(payload) if payload.is_healthy() => {
                        health_ok = true;
                        version = payload.version;
                    }
                    Ok(payload) => {
                        health_error = join_diag(
                            &health_error,
                            format!("Public health status: {}", payload.status),
                        );
                    }
                    Err(_) => health_ok = true,
                }
            }
            Ok(response) => {
                health_error = join_diag(
                    &health_error,
                    format!("Public health: HTTP {}", response.status().as_u16()),
                );
            }
            Err(err) => {
                health_error = join_diag(&health_error, format!("Public health: {err}"));
            }
        }
    }

    // Step 2: the functional example, public first for an end-to-end view.
    let mut example_code: u16 = 0;
    if !record.example_url.is_empty() {
        let mut try_internal_example = false;
        match client.get(&record.example_url).send().await {
            Ok(response) => {
                example_code = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if (200..400).contains(&example_code) {
                    if content_type.contains("text/html") {
                        // Reverse proxies serve HTML error pages with 200.
                        example_error =
                            format!("Public: Unexpected HTML (HTTP {example_code})");
                        try_internal_example = true;
                    } else {
                        example_ok = true;
                    }
                } else {
                    example_error = format!(
                        "Public HTTP {}: {}",
                        example_code,
                        response.status().canonical_reason().unwrap_or("error")
                    );
                    try_internal_example = true;
                }
            }
            Err(err) => {
                example_error = format!("Public Connection: {err}");
                try_internal_example = true;
            }
        }

        // Public failed: diagnose via the internal network. An answering
        // internal route rescues the signal (the public path may sit behind
        // a broken proxy while the service itself is fine).
        if try_internal_example {
            let path = prober::path_from_url(&record.example_url);
            match prober::try_internal(client, record, &path).await {
                Ok(hit) => {
                    let code = hit.response.status().as_u16();
                    if (200..400).contains(&code) {
                        example_error =
                            join_diag(&example_error, format!("Internal OK (HTTP {code})"));
                        example_ok = true;
                    } else {
                        example_error = join_diag(
                            &example_error,
                            format!("Internal also failed (HTTP {code})"),
                        );
                    }
                }
                Err(_) => {
                    example_error = join_diag(&example_error, "Internal unreachable".to_string());
                }
            }
        }
    } else {
        // Nothing to exercise; the signal is vacuously fine.
        example_ok = true;
        example_error = "No ExampleURL configured".to_string();
    }

    // Step 3: verdict.
    let (status, last_error) = if health_ok && example_ok {
        (ServiceStatus::Healthy, String::new())
    } else if !health_ok {
        (ServiceStatus::Unhealthy, health_error)
    } else if example_code >= 500 || example_code == 0 {
        // 5xx or a dead connection: the service itself is down.
        (ServiceStatus::Unhealthy, example_error)
    } else {
        // 4xx: reachable but the endpoint misbehaves.
        (ServiceStatus::Degraded, example_error)
    };

    debug!(
        id = %record.id,
        status = %status,
        health_ok,
        example_ok,
        "check completed"
    );

    CheckResult {
        status,
        health_status: SignalStatus::from_ok(health_ok),
        example_status: SignalStatus::from_ok(example_ok),
        last_error,
        version,
        response_ms: start.elapsed().as_millis() as u64,
        resolved_host,
        resolved_port,
    }
}
