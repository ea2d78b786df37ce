//! The periodic monitor.
//!
//! Owns the 30-second check loop, the bounded worker pool that fans a
//! cycle out across the fleet, the retry-with-backoff wrapper around the
//! check engine, the per-service circuit breaker, and the subscriber
//! broadcast. Cycles run inline in the loop, so a slow cycle delays the
//! next tick instead of overlapping it — each service is enqueued exactly
//! once per cycle.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

use fleetpulse_registry::{Registry, ServiceStatus};

use crate::checker;
use crate::compliance::{self, ComplianceReport};
use crate::events::{Subscription, UpdateBus};
use crate::tester::{self, TestResult};

/// Tuning knobs for the monitor; `Default` is the production shape.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between fleet check cycles.
    pub interval: Duration,
    /// Concurrent probes per cycle.
    pub workers: usize,
    /// Check attempts per service per cycle.
    pub attempts: u32,
    /// Sleeps between attempts (linear backoff).
    pub backoff: Vec<Duration>,
    /// Per-request timeout for periodic probes.
    pub probe_timeout: Duration,
    /// Per-request timeout for operator-triggered tests.
    pub test_timeout: Duration,
    /// Consecutive failing cycles before the circuit opens.
    pub circuit_threshold: u32,
    /// How long an open circuit suppresses probing.
    pub circuit_cooldown: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            workers: 10,
            attempts: 3,
            backoff: vec![Duration::from_secs(1), Duration::from_secs(2)],
            probe_timeout: Duration::from_secs(5),
            test_timeout: Duration::from_secs(10),
            circuit_threshold: 5,
            circuit_cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// Background health monitor over a shared registry.
pub struct Monitor {
    registry: Arc<Registry>,
    bus: Arc<UpdateBus>,
    client: Client,
    test_client: Client,
    config: MonitorConfig,
}

impl Monitor {
    /// Create a monitor with the production configuration.
    pub fn new(registry: Arc<Registry>) -> Result<Self, reqwest::Error> {
        Self::with_config(registry, MonitorConfig::default())
    }

    /// Create a monitor with explicit tuning (tests shrink the timings).
    pub fn with_config(
        registry: Arc<Registry>,
        config: MonitorConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.probe_timeout).build()?;
        let test_client = Client::builder().timeout(config.test_timeout).build()?;
        Ok(Self {
            registry,
            bus: Arc::new(UpdateBus::new()),
            client,
            test_client,
            config,
        })
    }

    /// The registry this monitor writes into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Attach a subscriber queue for service updates.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Run until the shutdown signal flips: one immediate cycle, then one
    /// per interval.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            workers = self.config.workers,
            "monitor starting"
        );
        self.check_all().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    self.check_all().await;
                }
                _ = shutdown.changed() => {
                    info!("monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Check every registered service once, at bounded concurrency.
    ///
    /// Completes when the queue has drained and all workers are done.
    pub async fn check_all(self: &Arc<Self>) {
        let services = self.registry.get_all().await;
        let total = services.len();
        if total == 0 {
            return;
        }

        let queue: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(services.into_iter().map(|s| s.id).collect()));

        let workers = self.config.workers.clamp(1, total);
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let monitor = Arc::clone(self);
            pool.spawn(async move {
                loop {
                    let next = { queue.lock().await.pop_front() };
                    match next {
                        Some(id) => monitor.check_one(&id).await,
                        None => break,
                    }
                }
            });
        }
        while pool.join_next().await.is_some() {}

        info!(count = total, "fleet check completed");
    }

    /// One service's cycle: circuit gate, retried check, write-back,
    /// circuit bookkeeping, history, broadcast.
    async fn check_one(&self, id: &str) {
        let Some(snapshot) = self.registry.get(id).await else {
            return;
        };

        let now = epoch_secs();
        if snapshot.circuit_open_until > 0 {
            if now < snapshot.circuit_open_until {
                let until = snapshot.circuit_open_until;
                let updated = self
                    .registry
                    .update(id, |rec| {
                        rec.status = ServiceStatus::Unhealthy;
                        rec.last_error = format!(
                            "Circuit Open (cooling down until {})",
                            format_clock(until)
                        );
                        rec.last_checked = now;
                        rec.push_history(ServiceStatus::Unhealthy);
                    })
                    .await;
                if let Some(rec) = updated {
                    self.bus.broadcast(&rec.update_event());
                }
                debug!(%id, until, "circuit open, probe suppressed");
                return;
            }
            // Cooldown over: close the breaker before probing again.
            self.registry
                .update(id, |rec| {
                    rec.consecutive_failures = 0;
                    rec.circuit_open_until = 0;
                })
                .await;
            debug!(%id, "circuit cooldown expired, resuming probes");
        }

        // Retry until healthy or attempts are spent.
        let mut result = checker::check_service(&self.client, &snapshot).await;
        let mut attempt: u32 = 1;
        while result.status != ServiceStatus::Healthy && attempt < self.config.attempts {
            let delay = self
                .config
                .backoff
                .get(attempt as usize - 1)
                .copied()
                .unwrap_or_default();
            debug!(%id, attempt, status = %result.status, "check failed, retrying");
            tokio::time::sleep(delay).await;
            result = checker::check_service(&self.client, &snapshot).await;
            attempt += 1;
        }

        let threshold = self.config.circuit_threshold;
        let cooldown = self.config.circuit_cooldown.as_secs();
        let updated = self
            .registry
            .update(id, |rec| {
                rec.last_checked = epoch_secs();
                rec.response_ms = result.response_ms;
                rec.status = result.status;
                rec.health_status = Some(result.health_status);
                rec.example_status = Some(result.example_status);
                rec.last_error = result.last_error.clone();
                if !result.version.is_empty() {
                    rec.version = result.version.clone();
                }
                if let Some(host) = &result.resolved_host {
                    rec.docker_name = host.clone();
                }
                if let Some(port) = result.resolved_port {
                    rec.port = port;
                }

                if result.status == ServiceStatus::Healthy {
                    rec.consecutive_failures = 0;
                    rec.circuit_open_until = 0;
                } else {
                    rec.consecutive_failures += 1;
                    if rec.consecutive_failures >= threshold {
                        rec.circuit_open_until = epoch_secs() + cooldown;
                        rec.last_error =
                            format!("Circuit Breaker Tripped ({threshold} failing checks)");
                    }
                }

                rec.push_history(result.status);
            })
            .await;

        if let Some(rec) = updated {
            self.bus.broadcast(&rec.update_event());
        }
    }

    /// Run the test engine for a service and record its verdict.
    ///
    /// Returns `None` for an unknown id.
    pub async fn run_test(&self, id: &str) -> Option<TestResult> {
        let snapshot = self.registry.get(id).await?;
        let result = tester::test_service(&self.test_client, &snapshot).await;

        let updated = self
            .registry
            .update(id, |rec| {
                rec.test_status = Some(result.status);
                rec.test_error = result.error.clone();
            })
            .await;
        if let Some(rec) = updated {
            let mut event = rec.update_event();
            event.test_status = rec.test_status;
            event.test_error = rec.test_error.clone();
            self.bus.broadcast(&event);
        }

        info!(%id, status = %result.status, "active link test completed");
        Some(result)
    }

    /// Run a compliance scan for a service. `None` for an unknown id.
    pub async fn run_compliance(&self, id: &str) -> Option<ComplianceReport> {
        let snapshot = self.registry.get(id).await?;
        Some(compliance::scan(&self.test_client, &snapshot).await)
    }
}

/// Seconds since the Unix epoch.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Render an epoch timestamp as `HH:MM:SS` (UTC), for cooldown diagnostics.
fn format_clock(epoch: u64) -> String {
    let day = epoch % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, (day % 3600) / 60, day % 60)
}
