//! End-to-end startup tests
//!
//! These tests run the same steps as the binary: read the configuration,
//! load the target list, resolve the source identity and start probing.

use std::sync::Arc;
use std::time::Duration;

use http_pinger::actors::consumer::EventConsumer;
use http_pinger::actors::messages::EventKind;
use http_pinger::actors::probe::{ProbeContext, http_client, spawn_probes};
use http_pinger::alerts::build_notifier;
use http_pinger::config::read_config_file;
use http_pinger::diagnostics::{DiagnosticTrigger, TraceOptions};
use http_pinger::source::SourceIdentity;
use http_pinger::targets::load_targets;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_full_startup_sequence() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string("198.51.100.23"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let urls_file = dir.path().join("urls.txt");
    std::fs::write(
        &urls_file,
        format!(
            "{uri}/up\n\nftp://ignored.example\n  {uri}/missing  \n",
            uri = mock_server.uri()
        ),
    )
    .unwrap();

    let config_file = dir.path().join("config.json");
    std::fs::write(
        &config_file,
        serde_json::json!({
            "lag": 1,
            "interval": 3600,
            "urls_file": urls_file,
            "source_lookup_url": format!("{}/ip", mock_server.uri()),
            "notifier": { "webhook": { "url": format!("{}/hook", mock_server.uri()) } }
        })
        .to_string(),
    )
    .unwrap();

    let config = read_config_file(&config_file).unwrap();
    let targets = load_targets(&config.urls_file).unwrap();
    assert_eq!(targets.len(), 2);

    let client = http_client(config.timeout()).unwrap();
    let source = SourceIdentity::resolve(&client, &config.source_lookup_url)
        .await
        .unwrap();

    let tracer = CountingTracer::default();
    let context = ProbeContext {
        notifier: build_notifier(&config, client.clone()),
        diagnostics: DiagnosticTrigger::new(
            Arc::new(tracer.clone()),
            TraceOptions::default(),
            config.trace_timeout(),
        ),
        config: Arc::new(config),
        client,
        source,
    };

    let (event_tx, event_rx) = mpsc::channel(context.config.event_buffer);
    let _handles = spawn_probes(&targets, &context, &event_tx);
    drop(event_tx);

    let sink = CollectingSink::default();
    tokio::spawn(EventConsumer::new(event_rx).with_sink(sink.clone()).run());

    let collected = sink.clone();
    assert!(eventually(Duration::from_secs(5), || collected.len() == 2).await);

    let events = sink.snapshot();
    assert!(events.iter().all(|event| event.source == "198.51.100.23"));
    assert_eq!(
        events.iter().filter(|event| event.kind == EventKind::Ok).count(),
        1
    );
    // unmatched path answers 404
    assert_eq!(
        events.iter().filter(|event| event.status == 404).count(),
        1
    );

    assert!(eventually(Duration::from_secs(2), || tracer.count() == 1).await);

    let hooks = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/hook")
        .count();
    assert_eq!(hooks, 1);
}

#[tokio::test]
async fn test_failed_source_lookup_aborts_startup() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = http_client(Duration::from_secs(5)).unwrap();
    let result = SourceIdentity::resolve(&client, &mock_server.uri()).await;

    assert!(result.is_err());
}
