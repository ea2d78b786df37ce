//! fleetpulse-health — the probing engine.
//!
//! Layers, leaves first:
//!
//! - [`prober`] — candidate-target enumeration and the sequential internal
//!   probe helper shared by both engines
//! - [`checker`] — the two-signal check engine (liveness + functional
//!   example → tri-state verdict)
//! - [`tester`] — operator-triggered one-shot functional probes
//! - [`events`] — the bounded per-subscriber fan-out bus
//! - [`monitor`] — periodic scheduler, bounded worker pool, retry loop,
//!   and circuit breaker
//! - [`version`] — background sweep for newer registry image tags
//! - [`compliance`] — on-demand conformance scans
//!
//! The engines are pure over record snapshots; only the monitor writes
//! back into the registry.

pub mod checker;
pub mod compliance;
pub mod events;
pub mod monitor;
pub mod prober;
pub mod tester;
pub mod version;

pub use checker::CheckResult;
pub use events::{Subscription, UpdateBus, SUBSCRIBER_CAPACITY};
pub use monitor::{Monitor, MonitorConfig};
pub use tester::TestResult;
