//! Fleet conformance scans.
//!
//! Checks a service against the fleet's conventions: a non-conflicting
//! port, a standard liveness payload, and a detectable version. On-demand
//! only; never scheduled.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use fleetpulse_registry::ServiceRecord;

use crate::monitor::epoch_secs;
use crate::prober::FALLBACK_PORT;

/// One conformance check's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl ValidationResult {
    fn pass() -> Self {
        Self {
            passed: true,
            reason: String::new(),
        }
    }

    fn pass_with(reason: &str) -> Self {
        Self {
            passed: true,
            reason: reason.to_string(),
        }
    }

    fn fail(reason: String) -> Self {
        Self {
            passed: false,
            reason,
        }
    }
}

/// Conformance report for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub service_id: String,
    pub standard_port: ValidationResult,
    pub health_format: ValidationResult,
    pub version_endpoint: ValidationResult,
    /// Passed fraction scaled to 0–100.
    pub total_score: u32,
    pub last_checked: u64,
}

/// The payload shape a conformant liveness endpoint returns.
#[derive(Debug, Default, Deserialize)]
struct ExpectedHealth {
    #[serde(default)]
    status: String,
    #[serde(default)]
    service: String,
}

/// Scan one service against the fleet conventions.
pub async fn scan(client: &Client, record: &ServiceRecord) -> ComplianceReport {
    let standard_port = check_port(record);
    let health_format = check_health_format(client, record).await;
    let version_endpoint = check_version(record);

    let passed = [&standard_port, &health_format, &version_endpoint]
        .iter()
        .filter(|r| r.passed)
        .count() as u32;

    ComplianceReport {
        service_id: record.id.clone(),
        standard_port,
        health_format,
        version_endpoint,
        total_score: passed * 100 / 3,
        last_checked: epoch_secs(),
    }
}

fn check_port(record: &ServiceRecord) -> ValidationResult {
    if record.port == FALLBACK_PORT {
        ValidationResult::fail("Uses default 8080 (High Conflict Risk)".to_string())
    } else {
        ValidationResult::pass()
    }
}

async fn check_health_format(client: &Client, record: &ServiceRecord) -> ValidationResult {
    if record.health_url.is_empty() {
        return ValidationResult::fail("No Health URL configured".to_string());
    }
    let response = match client.get(&record.health_url).send().await {
        Ok(response) => response,
        Err(err) => return ValidationResult::fail(format!("Unreachable: {err}")),
    };
    if response.status() != StatusCode::OK {
        return ValidationResult::fail(format!("HTTP {}", response.status().as_u16()));
    }
    let body = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ExpectedHealth>(&body) {
        Ok(payload) if !payload.status.is_empty() && !payload.service.is_empty() => {
            ValidationResult::pass()
        }
        Ok(_) => ValidationResult::fail("Missing standard keys (status, service)".to_string()),
        Err(_) => ValidationResult::fail("Invalid JSON or Non-Standard Format".to_string()),
    }
}

fn check_version(record: &ServiceRecord) -> ValidationResult {
    // The checker populates `version` from the liveness payload; its
    // presence is the signal that the service reports one.
    if record.version.is_empty() {
        ValidationResult::fail("No Version detected".to_string())
    } else {
        ValidationResult::pass_with("Version detected")
    }
}
