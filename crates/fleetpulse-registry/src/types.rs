//! Domain types for monitored services.
//!
//! All types are JSON-serializable; status enums render as the lowercase
//! strings the API and the catalog use.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a monitored service.
pub type ServiceId = String;

/// Number of verdicts retained in a record's health history.
pub const HISTORY_LIMIT: usize = 5;

/// Synthesized per-service health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of a single probe signal (liveness or functional example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Ok,
    Fail,
}

impl SignalStatus {
    /// Fold a boolean probe outcome into a signal status.
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            Self::Ok
        } else {
            Self::Fail
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Verdict of an operator-triggered active link test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passing,
    Failed,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passing => write!(f, "passing"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A monitored microservice: stable identity plus mutable health fields.
///
/// Identity and URL fields come from the catalog and stay fixed, with one
/// exception: `docker_name` and `port` are refined to whichever internal
/// target answered the last successful liveness probe. All health fields
/// are written by the monitor under the registry's exclusive lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServiceRecord {
    pub id: ServiceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub docker_name: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub example_url: String,
    #[serde(default)]
    pub health_url: String,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<SignalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_status: Option<SignalStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_error: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_version: String,
    #[serde(default)]
    pub update_available: bool,
    /// Epoch seconds of the last completed probe, 0 before the first.
    #[serde(default)]
    pub last_checked: u64,
    #[serde(default)]
    pub response_ms: u64,
    /// Last [`HISTORY_LIMIT`] verdicts, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_history: Vec<ServiceStatus>,

    /// Back-to-back non-healthy verdicts; drives the circuit breaker.
    #[serde(skip)]
    pub consecutive_failures: u32,
    /// Epoch seconds until which probing is suppressed. 0 = circuit closed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub circuit_open_until: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_error: String,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl ServiceRecord {
    /// Append a verdict to the history ring, dropping the oldest entry
    /// once the ring is full.
    pub fn push_history(&mut self, verdict: ServiceStatus) {
        self.health_history.push(verdict);
        if self.health_history.len() > HISTORY_LIMIT {
            self.health_history.remove(0);
        }
    }

    /// Build the broadcast event for this record's current state.
    pub fn update_event(&self) -> ServiceUpdate {
        ServiceUpdate {
            id: self.id.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
            response_ms: self.response_ms,
            test_status: None,
            test_error: String::new(),
        }
    }
}

/// Event broadcast to subscribers after every write-back.
///
/// The test fields are populated only for updates emitted by the test
/// engine; periodic check updates leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub id: ServiceId,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_error: String,
    pub response_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_error: String,
}
