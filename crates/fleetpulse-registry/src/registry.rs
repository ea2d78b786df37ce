//! The shared service registry.
//!
//! Single owner of all mutable service state. Readers take the shared lock
//! and receive cloned snapshots; writers funnel through [`Registry::update`]
//! under the exclusive lock. Services are registered at startup and never
//! removed.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{ServiceId, ServiceRecord};

/// Map from service id to record, guarded by a reader/writer lock.
#[derive(Default)]
pub struct Registry {
    services: RwLock<HashMap<ServiceId, ServiceRecord>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. An existing record with the same id is replaced.
    pub async fn add(&self, record: ServiceRecord) {
        let mut services = self.services.write().await;
        debug!(id = %record.id, "service registered");
        services.insert(record.id.clone(), record);
    }

    /// Snapshot a single record by id.
    pub async fn get(&self, id: &str) -> Option<ServiceRecord> {
        let services = self.services.read().await;
        services.get(id).cloned()
    }

    /// Whether a service id is registered.
    pub async fn contains(&self, id: &str) -> bool {
        let services = self.services.read().await;
        services.contains_key(id)
    }

    /// Snapshot all records, sorted by name for stable output.
    pub async fn get_all(&self) -> Vec<ServiceRecord> {
        let services = self.services.read().await;
        let mut list: Vec<ServiceRecord> = services.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Number of registered services.
    pub async fn len(&self) -> usize {
        let services = self.services.read().await;
        services.len()
    }

    /// Whether the registry holds no services.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply a mutation to a record under the exclusive lock.
    ///
    /// Returns a snapshot of the record after the mutation, or `None` when
    /// the id is unknown. This is the only write path for health fields.
    pub async fn update<F>(&self, id: &str, mutate: F) -> Option<ServiceRecord>
    where
        F: FnOnce(&mut ServiceRecord),
    {
        let mut services = self.services.write().await;
        let record = services.get_mut(id)?;
        mutate(record);
        Some(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceStatus;

    fn record(id: &str, name: &str) -> ServiceRecord {
        ServiceRecord {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_and_get() {
        let registry = Registry::new();
        registry.add(record("a", "alpha")).await;

        assert!(registry.contains("a").await);
        let snapshot = registry.get("a").await.unwrap();
        assert_eq!(snapshot.name, "alpha");
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn add_replaces_existing_id() {
        let registry = Registry::new();
        registry.add(record("a", "alpha")).await;
        registry.add(record("a", "renamed")).await;

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("a").await.unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn get_all_sorted_by_name() {
        let registry = Registry::new();
        registry.add(record("z", "zeta")).await;
        registry.add(record("a", "alpha")).await;
        registry.add(record("m", "mid")).await;

        let names: Vec<String> = registry
            .get_all()
            .await
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn update_mutates_under_lock() {
        let registry = Registry::new();
        registry.add(record("a", "alpha")).await;

        let updated = registry
            .update("a", |rec| {
                rec.status = ServiceStatus::Healthy;
                rec.response_ms = 42;
            })
            .await
            .unwrap();
        assert_eq!(updated.status, ServiceStatus::Healthy);

        let snapshot = registry.get("a").await.unwrap();
        assert_eq!(snapshot.response_ms, 42);
    }

    #[tokio::test]
    async fn update_unknown_id_is_none() {
        let registry = Registry::new();
        assert!(registry.update("nope", |_| {}).await.is_none());
    }

    #[tokio::test]
    async fn snapshots_are_decoupled() {
        let registry = Registry::new();
        registry.add(record("a", "alpha")).await;

        let mut snapshot = registry.get("a").await.unwrap();
        snapshot.status = ServiceStatus::Unhealthy;

        // Mutating the snapshot does not touch the registry.
        assert_eq!(
            registry.get("a").await.unwrap().status,
            ServiceStatus::Unknown
        );
    }
}
