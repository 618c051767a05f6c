//! Submission Integration Tests
//!
//! Runs the survey client against a local HTTP endpoint and checks the wire
//! format and the schedule.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::Value;
use survey_client::{ConstMap, Logger, ProgramCollector, Registry, SurveyClient, SurveyConfig, fields};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Helpers
// =============================================================================

/// One request as seen by the test endpoint.
#[derive(Debug)]
struct Captured {
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    tx: mpsc::UnboundedSender<Captured>,
}

async fn record(State(state): State<EndpointState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let _ = state.tx.send(Captured { headers, body });
    state.status
}

/// Start an endpoint answering every POST with `status`.
async fn start_endpoint(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let router = Router::new()
        .route("/api/stats/v1/submit", post(record))
        .with_state(EndpointState { status, tx });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}/api/stats/v1/submit", addr), rx)
}

/// URL on which nothing listens.
async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);
    format!("http://{}/submit", addr)
}

#[derive(Default)]
struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl RecordingLogger {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

async fn wait_for_count(logger: &RecordingLogger, count: usize, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if logger.count() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    logger.count() >= count
}

fn registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::with_defaults());
    registry
        .register(ProgramCollector::new("kapid", "1.4.0", None))
        .unwrap();
    registry
        .register(ConstMap::must_new(
            "usercnt",
            fields! { "desc" => "Number of users", "type" => "int", "value" => 42 },
        ))
        .unwrap();
    registry
}

// =============================================================================
// Run Once
// =============================================================================

#[tokio::test]
async fn test_run_once_submits_single_payload() {
    let (url, mut rx) = start_endpoint(StatusCode::OK).await;
    let logger = Arc::new(RecordingLogger::default());
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_interval(Duration::ZERO)
        .with_logger(logger.clone());

    let client = SurveyClient::new(&config, registry()).unwrap();
    let handle = client.start(CancellationToken::new()).unwrap();

    let request = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("No submission received")
        .expect("Endpoint closed");

    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("Run-once loop did not finish")
        .unwrap();

    // Exactly one submission
    assert!(rx.try_recv().is_err());
    assert!(logger.messages().is_empty(), "{:?}", logger.messages());

    // Headers
    assert_eq!(request.headers["x-kopano-stats-request"], "1");
    assert_eq!(request.headers["content-type"], "application/json");
    assert_eq!(
        request.headers["user-agent"],
        format!("survey-client/{}", env!("CARGO_PKG_VERSION")).as_str()
    );

    // Body
    let body: Value = serde_json::from_slice(&request.body).expect("Body is not JSON");
    assert_eq!(body["version"], 2);
    let stats = body["stats"].as_object().expect("stats is not an object");
    assert!(stats.contains_key("utsname"));
    assert_eq!(stats["program_name"]["value"], "kapid");
    assert_eq!(stats["program_version"]["value"], "1.4.0");
    assert!(!stats.contains_key("program_guid"));
    assert_eq!(stats["usercnt"]["value"], 42);
    assert_eq!(stats["usercnt"]["type"], "int");
}

#[tokio::test]
async fn test_custom_user_agent() {
    let (url, mut rx) = start_endpoint(StatusCode::OK).await;
    let mut config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_interval(Duration::ZERO);
    config.user_agent = Some("kapid/1.4.0".to_string());

    let client = SurveyClient::new(&config, Arc::new(Registry::new())).unwrap();
    client.start(CancellationToken::new()).unwrap();

    let request = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("No submission received")
        .expect("Endpoint closed");

    assert_eq!(request.headers["user-agent"], "kapid/1.4.0");
    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body, serde_json::json!({ "version": 2, "stats": {} }));
}

#[tokio::test]
async fn test_disabled_switch_sends_nothing() {
    let (url, mut rx) = start_endpoint(StatusCode::OK).await;
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_interval(Duration::ZERO);
    config.switch.disable();

    let client = SurveyClient::new(&config, registry()).unwrap();
    let handle = client.start(CancellationToken::new()).unwrap();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("Run-once loop did not finish")
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn test_failure_retries_after_error_delay() {
    let logger = Arc::new(RecordingLogger::default());
    let config = SurveyConfig::default()
        .with_url(refused_url().await)
        .with_start_delay(Duration::ZERO)
        .with_error_delay(Duration::from_millis(200))
        .with_interval(Duration::from_secs(3600))
        .with_logger(logger.clone());

    let client = SurveyClient::new(&config, registry()).unwrap();
    let cancel = CancellationToken::new();
    let handle = client.start(cancel.clone()).unwrap();

    assert!(wait_for_count(&logger, 1, Duration::from_secs(10)).await);
    // One message per failed attempt
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(logger.count(), 1);

    // The retry follows the error delay rather than the hour-long interval.
    assert!(wait_for_count(&logger, 2, Duration::from_secs(10)).await);
    for message in logger.messages() {
        assert!(message.starts_with("survey client failed: "), "{message}");
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("Loop did not stop after cancellation")
        .unwrap();
}

#[tokio::test]
async fn test_error_status_counts_as_failure() {
    let (url, mut rx) = start_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
    let logger = Arc::new(RecordingLogger::default());
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_error_delay(Duration::from_millis(100))
        .with_interval(Duration::from_secs(3600))
        .with_logger(logger.clone());

    let client = SurveyClient::new(&config, registry()).unwrap();
    let cancel = CancellationToken::new();
    let handle = client.start(cancel.clone()).unwrap();

    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("No submission received")
            .expect("Endpoint closed");
    }
    assert!(wait_for_count(&logger, 2, Duration::from_secs(10)).await);
    assert!(logger.messages()[0].contains("500"), "{:?}", logger.messages());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("Loop did not stop after cancellation")
        .unwrap();
}

#[tokio::test]
async fn test_run_once_failure_stops_without_error_delay() {
    let logger = Arc::new(RecordingLogger::default());
    let config = SurveyConfig::default()
        .with_url(refused_url().await)
        .with_start_delay(Duration::ZERO)
        .with_error_delay(Duration::ZERO)
        .with_interval(Duration::ZERO)
        .with_logger(logger.clone());

    let client = SurveyClient::new(&config, registry()).unwrap();
    let handle = client.start(CancellationToken::new()).unwrap();

    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("Run-once loop did not finish")
        .unwrap();
    assert_eq!(logger.count(), 1);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_double_start_is_rejected() {
    let (url, _rx) = start_endpoint(StatusCode::OK).await;
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::from_secs(3600));

    let client = SurveyClient::new(&config, registry()).unwrap();
    let cancel = CancellationToken::new();
    let handle = client.start(cancel.clone()).unwrap();

    let second = client.start(cancel.clone());
    assert!(matches!(second, Err(survey_client::ClientError::AlreadyStarted)));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("Loop did not stop after cancellation")
        .unwrap();
}

#[tokio::test]
async fn test_cancel_during_interval_wait() {
    let (url, mut rx) = start_endpoint(StatusCode::OK).await;
    let logger = Arc::new(RecordingLogger::default());
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_interval(Duration::from_secs(3600))
        .with_logger(logger.clone());

    let client = SurveyClient::new(&config, registry()).unwrap();
    let cancel = CancellationToken::new();
    let handle = client.start(cancel.clone()).unwrap();

    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("No submission received")
        .expect("Endpoint closed");
    // Let the loop settle into the interval wait.
    tokio::time::sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("Loop did not stop after cancellation")
        .unwrap();

    assert!(rx.try_recv().is_err());
    assert!(logger.messages().is_empty(), "{:?}", logger.messages());
}

#[tokio::test]
async fn test_start_survey_client_helper() {
    let (url, mut rx) = start_endpoint(StatusCode::NO_CONTENT).await;
    let config = SurveyConfig::default()
        .with_url(url)
        .with_start_delay(Duration::ZERO)
        .with_interval(Duration::ZERO);

    let handle =
        survey_client::start_survey_client(Some(&config), None, CancellationToken::new()).unwrap();
    let request = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("No submission received")
        .expect("Endpoint closed");
    handle.await.unwrap();

    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert!(body["stats"]["utsname"]["value"].is_string());
}
