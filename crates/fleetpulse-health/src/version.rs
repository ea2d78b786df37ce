//! Image version sweep.
//!
//! Queries the container registry's OCI tags endpoint for each service and
//! records the newest semantic-version tag, flagging records whose running
//! version lags behind. Runs on a slow cadence; registry lookups are
//! best-effort and failures just leave the fields empty.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info};

use fleetpulse_registry::{Registry, ServiceRecord};

/// Container registry queried for tags.
const REGISTRY_HOST: &str = "ghcr.io";

/// Delay before the first sweep, so probed `version` fields exist.
const INITIAL_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<String>,
}

/// Looks up the newest published image tag per service.
pub struct VersionChecker {
    client: Client,
    owner: String,
}

impl VersionChecker {
    /// Create a checker for images under `owner` on ghcr.io.
    pub fn new(owner: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            owner: owner.into(),
        })
    }

    /// Image-path patterns tried for a service, in order.
    fn image_paths(&self, record: &ServiceRecord) -> Vec<String> {
        let name = if record.name.is_empty() {
            &record.id
        } else {
            &record.name
        };
        vec![
            format!("{}/{}", self.owner, name),
            format!("{}/services/{}", self.owner, name),
        ]
    }

    /// Find the newest semver tag for a service, if any pattern resolves.
    pub async fn latest_version(&self, record: &ServiceRecord) -> Option<String> {
        for image in self.image_paths(record) {
            match self.fetch_tags(&image).await {
                Ok(tags) if !tags.is_empty() => {
                    if let Some(latest) = extract_latest(&tags) {
                        return Some(latest);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(%image, error = %err, "tag listing failed");
                }
            }
        }
        None
    }

    async fn fetch_tags(&self, image: &str) -> Result<Vec<String>, reqwest::Error> {
        let url = format!("https://{REGISTRY_HOST}/v2/{image}/tags/list");
        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        let list: TagList = response.json().await?;
        Ok(list.tags)
    }

    /// Refresh `latest_version` / `update_available` for the whole fleet.
    pub async fn sweep(&self, registry: &Registry) {
        let services = registry.get_all().await;
        let total = services.len();
        let mut found = 0;
        for service in services {
            let latest = self.latest_version(&service).await;
            registry
                .update(&service.id, |rec| match &latest {
                    Some(latest) => {
                        rec.update_available = update_available(&rec.version, latest);
                        rec.latest_version = latest.clone();
                    }
                    None => {
                        rec.latest_version.clear();
                        rec.update_available = false;
                    }
                })
                .await;
            if latest.is_some() {
                found += 1;
            }
        }
        info!(total, found, "version sweep completed");
    }

    /// Sweep on a slow cadence until shutdown.
    pub async fn run(
        self,
        registry: Arc<Registry>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut next = INITIAL_DELAY.min(interval);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(next) => {
                    self.sweep(&registry).await;
                    next = interval;
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}

/// Whether a running version should be flagged as behind `latest`.
///
/// The `1.0.0` placeholder that unversioned services report is ignored.
fn update_available(current: &str, latest: &str) -> bool {
    !current.is_empty() && current != latest && current != "1.0.0"
}

/// Parse a `MAJOR.MINOR.PATCH` tag, tolerating a `v` prefix.
fn parse_semver(tag: &str) -> Option<(u64, u64, u64)> {
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    let mut parts = tag.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Highest semantic version among the tags, normalized without `v`.
fn extract_latest(tags: &[String]) -> Option<String> {
    tags.iter()
        .filter(|tag| tag.as_str() != "latest")
        .filter_map(|tag| parse_semver(tag))
        .max()
        .map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}
