//! Internal probe helpers.
//!
//! Services live behind several possible internal names (host networking,
//! compose DNS, generated container names) and up to two ports. The prober
//! walks the candidate matrix one request at a time and hands back the
//! first answering response together with the target that produced it.

use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use fleetpulse_registry::ServiceRecord;

/// Backup port always probed when the record's port differs.
pub const FALLBACK_PORT: u16 = 8080;

/// Outcome of the last failed candidate when no target answered.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("connection: {0}")]
    Connection(String),
}

/// A response from the first answering internal target.
pub struct ProbeHit {
    pub response: Response,
    /// Host that answered, for refining the record's `docker_name`.
    pub host: String,
    /// Port that answered, for refining the record's `port`.
    pub port: u16,
}

/// Candidate internal hosts, in priority order, deduplicated.
///
/// `localhost` first reflects the common host-networked deployment.
pub fn candidate_hosts(record: &ServiceRecord) -> Vec<String> {
    let mut hosts = vec!["localhost".to_string()];
    if !record.docker_name.is_empty() {
        hosts.push(record.docker_name.clone());
    }
    if !record.id.is_empty() && record.id != record.docker_name {
        hosts.push(format!("{}-app-1", record.id));
    }

    let mut unique = Vec::with_capacity(hosts.len());
    for host in hosts {
        if !host.is_empty() && !unique.contains(&host) {
            unique.push(host);
        }
    }
    unique
}

/// Candidate internal ports: the record's port, then the 8080 backup.
pub fn candidate_ports(record: &ServiceRecord) -> Vec<u16> {
    let mut ports = Vec::with_capacity(2);
    if record.port > 0 {
        ports.push(record.port);
    }
    if record.port != FALLBACK_PORT {
        ports.push(FALLBACK_PORT);
    }
    ports
}

/// Extract path+query from a full URL, tolerating malformed input.
///
/// Falls back to locating the first `/` after an optional `scheme://`;
/// absent any path, `/` is returned.
pub fn path_from_url(raw: &str) -> String {
    if let Ok(parsed) = url::Url::parse(raw) {
        return match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };
    }

    let rest = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };
    match rest.find('/') {
        Some(idx) => rest[idx..].to_string(),
        None => "/".to_string(),
    }
}

/// Try each internal target in order until one answers.
///
/// A target counts as answered when the request completes without a
/// transport error and with status in [200, 500). A 5xx is treated as a
/// failed attempt; when nothing answers the error from the last attempt
/// is returned.
pub async fn try_internal(
    client: &Client,
    record: &ServiceRecord,
    path: &str,
) -> Result<ProbeHit, ProbeError> {
    let mut last_err = ProbeError::Connection("no internal candidates".to_string());

    for host in candidate_hosts(record) {
        for port in candidate_ports(record) {
            let target = format!("http://{host}:{port}{path}");
            match client.get(&target).send().await {
                Ok(response) => {
                    let code = response.status().as_u16();
                    if (200..500).contains(&code) {
                        return Ok(ProbeHit {
                            response,
                            host,
                            port,
                        });
                    }
                    debug!(%target, status = code, "internal candidate returned server error");
                    last_err = ProbeError::Status(code);
                }
                Err(err) => {
                    debug!(%target, error = %err, "internal candidate unreachable");
                    last_err = ProbeError::Connection(err.to_string());
                }
            }
        }
    }

    Err(last_err)
}

/// The payload shape liveness endpoints are expected to return.
#[derive(Debug, Default, Deserialize)]
pub struct HealthPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
}

impl HealthPayload {
    /// Whether the reported status counts as alive.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" || self.status == "ok"
    }
}
