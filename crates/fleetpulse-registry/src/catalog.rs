//! Service catalog loader.
//!
//! The catalog is a JSON document holding either a bare array of service
//! objects or `{ "services": [...] }` — both shapes are accepted because
//! the catalog generator has emitted both over time. Candidate paths are
//! tried in order; the first readable file wins.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::registry::Registry;
use crate::types::ServiceRecord;

/// Candidate catalog locations, in priority order (container vs local).
pub const CATALOG_PATHS: [&str; 3] = [
    "config/services.json",
    "../config/services.json",
    "./services.json",
];

/// Id under which the monitor registers itself.
pub const SELF_ID: &str = "fleetpulse";

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    services: Vec<ServiceRecord>,
}

/// Parse catalog bytes, accepting both the object and the bare-array shape.
pub fn parse_catalog(content: &[u8]) -> Result<Vec<ServiceRecord>, CatalogError> {
    match serde_json::from_slice::<CatalogFile>(content) {
        Ok(file) => Ok(file.services),
        Err(object_err) => match serde_json::from_slice::<Vec<ServiceRecord>>(content) {
            Ok(services) => Ok(services),
            Err(_) => Err(CatalogError::Parse(object_err)),
        },
    }
}

/// The monitor's own record, so the fleet view includes the monitor itself.
fn self_record(listen_port: u16) -> ServiceRecord {
    ServiceRecord {
        id: SELF_ID.to_string(),
        name: SELF_ID.to_string(),
        display_name: "Fleetpulse".to_string(),
        description: "The fleet health monitor".to_string(),
        category: "infrastructure".to_string(),
        port: listen_port,
        health_url: format!("http://localhost:{listen_port}/health"),
        tags: vec!["dashboard".to_string(), "infrastructure".to_string()],
        ..Default::default()
    }
}

fn find_catalog(explicit: Option<&Path>) -> Result<(PathBuf, Vec<u8>), CatalogError> {
    if let Some(path) = explicit {
        let content = std::fs::read(path)?;
        return Ok((path.to_path_buf(), content));
    }
    for candidate in CATALOG_PATHS {
        if let Ok(content) = std::fs::read(candidate) {
            return Ok((PathBuf::from(candidate), content));
        }
    }
    Err(CatalogError::NotFound(CATALOG_PATHS.join(", ")))
}

/// Register the self-record, then load the catalog into the registry.
///
/// Returns the number of catalog services loaded. A missing or broken
/// catalog is an error for the caller to log; the self-record is always
/// registered so the daemon still has something to monitor.
pub async fn load_services(
    registry: &Registry,
    listen_port: u16,
    explicit: Option<&Path>,
) -> Result<usize, CatalogError> {
    registry.add(self_record(listen_port)).await;

    let (path, content) = find_catalog(explicit)?;
    let services = parse_catalog(&content)?;

    let mut loaded = 0;
    for service in services {
        if service.id.is_empty() {
            warn!("skipping catalog entry without id");
            continue;
        }
        registry.add(service).await;
        loaded += 1;
    }

    info!(path = %path.display(), count = loaded, "service catalog loaded");
    Ok(loaded)
}
