//! Check engine scenarios against real HTTP fixtures.
//!
//! Each test stands up a scripted service on localhost and asserts the
//! two-signal classification and verdict synthesis.

mod common;

use std::time::Duration;

use reqwest::Client;

use common::{closed_port, fixture_record, spawn_fixture, Reply};
use fleetpulse_health::checker::check_service;
use fleetpulse_registry::{ServiceStatus, SignalStatus};

fn probe_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn healthy_when_both_signals_pass() {
    let fixture = spawn_fixture(
        Reply::json(r#"{"status":"ok","version":"1.2.3"}"#),
        Reply::json(r#"{"result": 1}"#),
    )
    .await;
    let record = fixture_record("svc-healthy", fixture.port, true);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Healthy);
    assert_eq!(result.health_status, SignalStatus::Ok);
    assert_eq!(result.example_status, SignalStatus::Ok);
    assert_eq!(result.version, "1.2.3");
    assert_eq!(result.last_error, "");
    assert_eq!(result.resolved_host.as_deref(), Some("localhost"));
    assert_eq!(result.resolved_port, Some(fixture.port));
}

#[tokio::test]
async fn degraded_on_example_404() {
    let fixture = spawn_fixture(Reply::json(r#"{"status":"ok"}"#), Reply::status(404)).await;
    let record = fixture_record("svc-404", fixture.port, true);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Degraded);
    assert_eq!(result.health_status, SignalStatus::Ok);
    assert_eq!(result.example_status, SignalStatus::Fail);
    assert!(result.last_error.contains("HTTP 404"), "{}", result.last_error);
}

#[tokio::test]
async fn unhealthy_on_example_502() {
    let fixture = spawn_fixture(Reply::json(r#"{"status":"ok"}"#), Reply::status(502)).await;
    let record = fixture_record("svc-502", fixture.port, true);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Unhealthy);
    assert_eq!(result.example_status, SignalStatus::Fail);
    assert!(result.last_error.contains("HTTP 502"), "{}", result.last_error);
}

#[tokio::test]
async fn html_decoy_is_degraded() {
    // The internal route 404s the example path, so the decoy cannot be
    // rescued by the internal retry.
    let internal = spawn_fixture(Reply::json(r#"{"status":"ok"}"#), Reply::status(404)).await;
    let public = spawn_fixture(
        Reply::status(500),
        Reply::html("<html><body>gateway error</body></html>"),
    )
    .await;
    let mut record = fixture_record("svc-html", internal.port, false);
    record.example_url = format!("http://127.0.0.1:{}/example", public.port);

    let result = check_service(&probe_client(), &record).await;

    // The example answered 200 but with an HTML page and the internal
    // retry also failed; the 200 status code keeps the verdict at degraded.
    assert_eq!(result.status, ServiceStatus::Degraded);
    assert_eq!(result.health_status, SignalStatus::Ok);
    assert_eq!(result.example_status, SignalStatus::Fail);
    assert!(
        result.last_error.contains("Unexpected HTML"),
        "{}",
        result.last_error
    );
    assert!(
        result.last_error.contains("Internal also failed (HTTP 404)"),
        "{}",
        result.last_error
    );
}

#[tokio::test]
async fn html_decoy_recovers_via_internal_route() {
    // The public route serves a proxy's HTML page, but the service itself
    // answers the same path internally; the retry promotes the signal.
    let internal = spawn_fixture(Reply::json(r#"{"status":"ok"}"#), Reply::json("{}")).await;
    let public = spawn_fixture(
        Reply::status(500),
        Reply::html("<html><body>gateway error</body></html>"),
    )
    .await;
    let mut record = fixture_record("svc-html-internal", internal.port, false);
    record.example_url = format!("http://127.0.0.1:{}/example", public.port);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Healthy);
    assert_eq!(result.example_status, SignalStatus::Ok);
}

#[tokio::test]
async fn missing_example_url_is_vacuously_ok() {
    let fixture = spawn_fixture(Reply::json(r#"{"status":"healthy"}"#), Reply::status(500)).await;
    let record = fixture_record("svc-no-example", fixture.port, false);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Healthy);
    assert_eq!(result.example_status, SignalStatus::Ok);
    // The example route was never touched.
    assert_eq!(fixture.example_hits.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn liveness_status_field_disagreement_fails() {
    let fixture = spawn_fixture(Reply::json(r#"{"status":"starting"}"#), Reply::status(200)).await;
    let record = fixture_record("svc-starting", fixture.port, true);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Unhealthy);
    assert_eq!(result.health_status, SignalStatus::Fail);
    assert!(
        result.last_error.contains("Internal health status: starting"),
        "{}",
        result.last_error
    );
}

#[tokio::test]
async fn plain_text_liveness_is_permissively_ok() {
    let fixture = spawn_fixture(Reply::text("OK"), Reply::json("{}")).await;
    let record = fixture_record("svc-plain", fixture.port, true);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.health_status, SignalStatus::Ok);
    assert_eq!(result.status, ServiceStatus::Healthy);
    // No version in a plain-text payload.
    assert_eq!(result.version, "");
}

#[tokio::test]
async fn public_health_url_fallback() {
    let fixture = spawn_fixture(
        Reply::json(r#"{"status":"ok","version":"3.1.0"}"#),
        Reply::json("{}"),
    )
    .await;
    // Internal candidates point at a dead port; only the public URL works.
    let mut record = fixture_record("svc-public-only", closed_port().await, false);
    record.health_url = format!("http://127.0.0.1:{}/health", fixture.port);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.health_status, SignalStatus::Ok);
    assert_eq!(result.status, ServiceStatus::Healthy);
    assert_eq!(result.version, "3.1.0");
    // Nothing internal answered, so no target refinement.
    assert_eq!(result.resolved_host, None);
}

#[tokio::test]
async fn unreachable_service_is_unhealthy_with_diagnostics() {
    let dead = closed_port().await;
    let mut record = fixture_record("svc-dead", dead, true);
    record.example_url = format!("http://127.0.0.1:{dead}/example");

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Unhealthy);
    assert_eq!(result.health_status, SignalStatus::Fail);
    assert_eq!(result.example_status, SignalStatus::Fail);
    assert!(
        result.last_error.contains("Internal health"),
        "{}",
        result.last_error
    );
}

#[tokio::test]
async fn internal_fallback_promotes_example_signal() {
    // Public example URL is dead, but the same path answers internally.
    let fixture = spawn_fixture(Reply::json(r#"{"status":"ok"}"#), Reply::json("{}")).await;
    let mut record = fixture_record("svc-internal-only", fixture.port, true);
    record.example_url = format!("http://127.0.0.1:{}/example", closed_port().await);

    let result = check_service(&probe_client(), &record).await;

    assert_eq!(result.status, ServiceStatus::Healthy);
    assert_eq!(result.example_status, SignalStatus::Ok);
    assert!(
        result.last_error.is_empty(),
        "healthy verdict clears the diagnostic: {}",
        result.last_error
    );
}
