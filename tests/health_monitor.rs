mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use common::{endpoint, start_programmable_backend, MockReply, ScriptedTransport, Step};
use endpoint_router::config::HealthCheckConfig;
use endpoint_router::health::{HealthMonitor, HistoryRecorder, MemoryHistoryStore, ProbeOutcome};
use endpoint_router::registry::{Endpoint, EndpointRegistry, HealthState};
use endpoint_router::transport::{HttpTransport, Transport};

fn monitor(
    endpoints: Vec<Arc<Endpoint>>,
    transport: Arc<dyn Transport>,
    config: HealthCheckConfig,
) -> (HealthMonitor, Arc<HistoryRecorder>) {
    let registry = Arc::new(EndpointRegistry::from_endpoints(endpoints));
    let recorder = Arc::new(HistoryRecorder::new(Arc::new(MemoryHistoryStore::new()), 20));
    (
        HealthMonitor::new(registry, recorder.clone(), transport, config),
        recorder,
    )
}

#[tokio::test]
async fn test_check_all_updates_status() {
    let up = endpoint("up", "up.test", &["manga"]);
    let down = endpoint("down", "down.test", &["manga"]);
    let transport = ScriptedTransport::new();
    transport.always("up.test", Step::Reply(200, "ok"));
    transport.always("down.test", Step::Reply(503, "maintenance"));

    let (monitor, _) = monitor(
        vec![up.clone(), down.clone()],
        transport.clone(),
        HealthCheckConfig::default(),
    );
    let outcomes = monitor.check_all().await;

    assert!(matches!(outcomes[0], ProbeOutcome::Healthy { .. }));
    assert_eq!(outcomes[1], ProbeOutcome::Unhealthy);

    assert_eq!(up.state(), HealthState::Healthy);
    assert!(up.last_response_time_ms().is_some());
    assert!(up.status().last_checked_at.is_some());

    // A single failed probe is enough.
    assert!(!down.is_healthy());
    assert_eq!(down.consecutive_failures(), 1);
    assert!(down.status().last_checked_at.is_some());
}

#[tokio::test]
async fn test_probe_uses_health_path_and_timeout() {
    let e = endpoint("e", "e.test", &["manga"]);
    let transport = ScriptedTransport::new();
    transport.always("e.test", Step::Reply(200, ""));

    let config = HealthCheckConfig {
        timeout_secs: 2,
        ..HealthCheckConfig::default()
    };
    let (monitor, _) = monitor(vec![e.clone()], transport.clone(), config);
    monitor.check(e).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/health");
    assert_eq!(requests[0].timeout, Duration::from_secs(2));
}

#[tokio::test]
async fn test_probe_success_recovers_endpoint() {
    let e = endpoint("e", "e.test", &["manga"]);
    for _ in 0..3 {
        e.mark_failure();
    }
    assert!(!e.is_healthy());

    let transport = ScriptedTransport::new();
    transport.always("e.test", Step::Reply(204, ""));
    let (monitor, _) = monitor(vec![e.clone()], transport, HealthCheckConfig::default());

    assert!(matches!(monitor.check(e.clone()).await, ProbeOutcome::Healthy { .. }));
    assert!(e.is_healthy());
    assert_eq!(e.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_timeout_probe_is_unhealthy() {
    let e = endpoint("e", "e.test", &["manga"]);
    let transport = ScriptedTransport::new();
    transport.always("e.test", Step::Timeout);
    let (monitor, recorder) = monitor(vec![e.clone()], transport, HealthCheckConfig::default());

    assert_eq!(monitor.check(e.clone()).await, ProbeOutcome::Unhealthy);
    assert!(!e.is_healthy());

    let mut samples = 0;
    for _ in 0..100 {
        samples = recorder.history(&e).await.unwrap().len();
        if samples == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(samples, 1);
}

#[tokio::test]
async fn test_run_probes_immediately_and_stops() {
    let e = endpoint("e", "e.test", &["manga"]);
    let transport = ScriptedTransport::new();
    transport.always("e.test", Step::Reply(200, ""));

    let config = HealthCheckConfig {
        interval_secs: 60,
        ..HealthCheckConfig::default()
    };
    let (monitor, _) = monitor(vec![e.clone()], transport.clone(), config);

    let (tx, rx) = broadcast::channel(1);
    let task = tokio::spawn(monitor.run(rx));

    for _ in 0..100 {
        if transport.call_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(transport.call_count(), 1);
    assert_eq!(e.state(), HealthState::Healthy);

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("monitor did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_disabled_monitor_returns() {
    let e = endpoint("e", "e.test", &["manga"]);
    let transport = ScriptedTransport::new();
    let config = HealthCheckConfig {
        enabled: false,
        ..HealthCheckConfig::default()
    };
    let (monitor, _) = monitor(vec![e], transport.clone(), config);

    let (_tx, rx) = broadcast::channel(1);
    tokio::time::timeout(Duration::from_secs(1), monitor.run(rx))
        .await
        .expect("disabled monitor should exit");
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_probe_over_http() {
    let (addr, log) = start_programmable_backend(|line| {
        if line.starts_with("GET /status ") {
            MockReply::ok(r#"{"status":"ok"}"#)
        } else {
            MockReply::status(404, "")
        }
    })
    .await;

    let e = Arc::new(Endpoint::new(
        "api",
        url::Url::parse(&format!("http://{}", addr)).unwrap(),
        [endpoint_router::Capability::new("manga")],
        "/status",
        3,
    ));
    let transport = Arc::new(HttpTransport::new("probe-tests/1.0").unwrap());
    let (monitor, _) = monitor(vec![e.clone()], transport, HealthCheckConfig::default());

    assert!(matches!(monitor.check(e.clone()).await, ProbeOutcome::Healthy { .. }));
    assert!(e.is_healthy());
    assert_eq!(log.lock().unwrap().len(), 1);
}
