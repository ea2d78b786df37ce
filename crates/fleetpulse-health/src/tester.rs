//! Operator-triggered active link tests.
//!
//! Exercises the record's example URL through the internal candidates with
//! a longer timeout than the periodic checker. Deliberately no `/health`
//! fallback when an example URL exists: the operator asked for the real
//! endpoint, and a passing `/health` must not mask a broken one.

use std::time::Instant;

use reqwest::Client;
use tracing::debug;

use fleetpulse_registry::{ServiceRecord, TestStatus};

use crate::prober;

/// Verdict and diagnostic of one active link test.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub status: TestStatus,
    pub error: String,
}

impl TestResult {
    fn passing(error: String) -> Self {
        Self {
            status: TestStatus::Passing,
            error,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            status: TestStatus::Failed,
            error,
        }
    }
}

/// Run a one-shot functional probe against a service.
pub async fn test_service(client: &Client, record: &ServiceRecord) -> TestResult {
    let start = Instant::now();

    if !record.example_url.is_empty() {
        let path = prober::path_from_url(&record.example_url);
        return match prober::try_internal(client, record, &path).await {
            Ok(hit) => {
                let code = hit.response.status().as_u16();
                let reason = hit.response.status().canonical_reason().unwrap_or("error");
                if (200..400).contains(&code) {
                    let elapsed = start.elapsed().as_millis();
                    let body = hit.response.bytes().await.unwrap_or_default();
                    // A payload carrying `result` or `tool` is the shape the
                    // fleet's services answer with; anything else still counts
                    // as reachable.
                    if is_expected_payload(&body) {
                        TestResult::passing(format!("OK in {elapsed}ms"))
                    } else {
                        TestResult::passing(format!("HTTP {code} in {elapsed}ms"))
                    }
                } else {
                    TestResult::failed(format!("HTTP {code}: {reason}"))
                }
            }
            Err(err) => TestResult::failed(format!("Connection failed: {err}")),
        };
    }

    // No example URL: probing the liveness endpoint is all we can do.
    debug!(id = %record.id, "no example url, testing /health instead");
    match prober::try_internal(client, record, "/health").await {
        Ok(hit) if (200..400).contains(&hit.response.status().as_u16()) => {
            TestResult::passing("Health OK".to_string())
        }
        _ => TestResult::failed(
            "No ExampleURL configured, internal health check failed".to_string(),
        ),
    }
}

/// Whether the body is a JSON object carrying a `result` or `tool` key.
fn is_expected_payload(body: &[u8]) -> bool {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            map.contains_key("result") || map.contains_key("tool")
        }
        _ => false,
    }
}
