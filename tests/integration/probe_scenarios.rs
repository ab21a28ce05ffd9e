//! Integration tests for single probe workers
//!
//! These tests verify that:
//! - Healthy targets produce OK events without side effects
//! - Status and latency anomalies produce Warning events, a notification and a trace
//! - Unreachable targets produce Fatal events and keep being polled
//! - A request running past its deadline is Fatal, independent of the lag threshold
//! - Notifier failures never stop a worker

use std::sync::Arc;
use std::time::Duration;

use http_pinger::actors::messages::EventKind;
use http_pinger::actors::probe::ProbeHandle;
use http_pinger::targets::Target;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn mock_target(status: u16, delay: Duration) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_delay(delay)
                .set_body_string("body"),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

fn target(mock_server: &MockServer) -> Target {
    Target::parse(&format!("{}/health", mock_server.uri())).unwrap()
}

#[tokio::test]
async fn test_fast_ok_response() {
    let mock_server = mock_target(200, Duration::from_millis(50)).await;
    let test = create_test_context(create_test_config(1, 60));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let target = target(&mock_server);
    let _handle = ProbeHandle::spawn(target.clone(), test.context.clone(), event_tx);

    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::Ok);
    assert_eq!(event.status, 200);
    assert_eq!(event.server, target.host());
    assert_eq!(event.source, SOURCE_IP);
    assert_eq!(event.lag, 1);
    assert_eq!(event.interval, 60);
    assert_eq!(event.error, "");
    assert!(event.responded_in.ends_with("ms"), "got {}", event.responded_in);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(test.tracer.count(), 0);
    assert_eq!(test.notifier.count(), 0);
}

#[tokio::test]
async fn test_unexpected_status_is_warning() {
    let mock_server = mock_target(500, Duration::from_millis(50)).await;
    let test = create_test_context(create_test_config(1, 60));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::Warning);
    assert_eq!(event.status, 500);
    assert_eq!(event.error, "Unexpected http status code!");

    let tracer = test.tracer.clone();
    assert!(eventually(Duration::from_secs(2), || tracer.count() == 1).await);
    assert_eq!(test.notifier.count(), 1);

    let notification = test.notifier.sent.lock().unwrap()[0].clone();
    assert_eq!(notification.subject, "Pinger alert");
    assert_eq!(notification.to, vec!["ops@example.com".to_string()]);
    assert_eq!(notification.event, event);
    assert_eq!(notification.body, event.to_json());
}

#[tokio::test]
async fn test_slow_response_is_warning() {
    let mock_server = mock_target(200, Duration::from_secs(2)).await;
    let test = create_test_context(create_test_config(1, 60));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::Warning);
    assert_eq!(event.status, 200);
    assert_eq!(event.error, "Responsed times over lag threshold!");
    assert!(event.responded_in.ends_with('s'));

    let tracer = test.tracer.clone();
    assert!(eventually(Duration::from_secs(2), || tracer.count() == 1).await);
}

#[tokio::test]
async fn test_slow_error_is_reported_once() {
    let mock_server = mock_target(503, Duration::from_secs(2)).await;
    let test = create_test_context(create_test_config(1, 60));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::Warning);
    assert_eq!(event.error, "Unexpected http status code!");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(test.tracer.count(), 1);
    assert_eq!(test.notifier.count(), 1);
}

#[tokio::test]
async fn test_unreachable_target_is_fatal_and_keeps_polling() {
    // nothing listens on the discard port
    let target = Target::parse("http://127.0.0.1:9/health").unwrap();
    let test = create_test_context(create_test_config(1, 1));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target, test.context.clone(), event_tx);

    let first = event_rx.recv().await.unwrap();
    assert_eq!(first.kind, EventKind::Fatal);
    assert_eq!(first.status, -1);
    assert_eq!(first.responded_in, "NaN");
    assert!(!first.error.is_empty());

    let second = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
        .await
        .expect("worker should keep polling after a transport failure")
        .unwrap();
    assert_eq!(second.kind, EventKind::Fatal);

    let tracer = test.tracer.clone();
    assert!(eventually(Duration::from_secs(2), || tracer.count() >= 2).await);
    assert!(test.notifier.count() >= 2);
}

#[tokio::test]
async fn test_stable_endpoint_produces_steady_ok_stream() {
    let mock_server = mock_target(200, Duration::ZERO).await;
    let test = create_test_context(create_test_config(1, 1));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::Ok);
    }

    assert_eq!(test.tracer.count(), 0);
    assert_eq!(test.notifier.count(), 0);
}

#[tokio::test]
async fn test_notifier_failure_does_not_stop_worker() {
    let mock_server = mock_target(500, Duration::ZERO).await;
    let mut test = create_test_context(create_test_config(1, 1));
    test.context.notifier = Arc::new(FailingNotifier);
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let _handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::Warning);
    }
}

#[tokio::test]
async fn test_probe_now_runs_out_of_schedule() {
    let mock_server = mock_target(200, Duration::ZERO).await;
    let test = create_test_context(create_test_config(1, 3600));
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let handle = ProbeHandle::spawn(target(&mock_server), test.context.clone(), event_tx);

    // scheduled startup probe
    event_rx.recv().await.unwrap();

    let event = handle.probe_now().await.unwrap();
    assert_eq!(event.kind, EventKind::Ok);

    let published = event_rx.recv().await.unwrap();
    assert_eq!(published, event);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_request_deadline_is_fatal() {
    let mock_server = mock_target(200, Duration::from_secs(4)).await;
    let mut config = create_test_config(5, 60);
    config.timeout = 1;
    let test = create_test_context(config);
    let (event_tx, mut event_rx) = mpsc::channel(4);

    let target = target(&mock_server);
    let start = tokio::time::Instant::now();
    let _handle = ProbeHandle::spawn(target.clone(), test.context.clone(), event_tx);

    let event = tokio::time::timeout(Duration::from_secs(3), event_rx.recv())
        .await
        .expect("request deadline was not enforced")
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(event.kind, EventKind::Fatal);
    assert_eq!(event.status, -1);
    assert_eq!(event.responded_in, "NaN");
    assert_eq!(event.server, target.host());
    assert!(!event.error.is_empty());
}
