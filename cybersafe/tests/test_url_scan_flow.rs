//! End-to-end scan flow against a mocked scanning service

use std::sync::Arc;
use std::time::Duration;

use maha_cybersafe::intelligence::{ReputationApiClient, ScanApiClient, ScanError};
use maha_cybersafe::{Config, PollPolicy, ReputationEngine, ReputationStatus, Safety};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        interval: Duration::from_millis(10),
    }
}

fn pending_body() -> serde_json::Value {
    serde_json::json!({
        "data": {"id": "abc123", "attributes": {"status": "queued"}}
    })
}

async fn mount_submission(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"type": "analysis", "id": "abc123"}
        })))
        .expect(1)
        .mount(mock_server)
        .await;
}

fn create_engine(mock_server: &MockServer, policy: PollPolicy) -> ReputationEngine {
    let client =
        ScanApiClient::new(mock_server.uri(), "test-api-key", Duration::from_secs(5)).unwrap();
    ReputationEngine::new(Arc::new(client), policy)
}

async fn analysis_requests(mock_server: &MockServer) -> usize {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/analyses/abc123")
        .count()
}

#[tokio::test]
async fn test_scan_completes_on_third_poll() {
    let mock_server = MockServer::start().await;
    mount_submission(&mock_server).await;

    // mounted first, so it answers until exhausted
    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "id": "abc123",
                "attributes": {
                    "status": "completed",
                    "stats": {"malicious": 1, "suspicious": 0, "undetected": 50, "harmless": 49, "timeout": 0}
                }
            },
            "meta": {"url_info": {"url": "http://example.com/"}}
        })))
        .mount(&mock_server)
        .await;

    let verdict = create_engine(&mock_server, fast_policy(10))
        .scan_url("http://example.com", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict.safety, Safety::Safe);
    assert_eq!(verdict.report.scan_id, "abc123");
    assert_eq!(verdict.report.stats.malicious, 1);
    assert_eq!(analysis_requests(&mock_server).await, 3);
}

#[tokio::test]
async fn test_scan_times_out() {
    let mock_server = MockServer::start().await;
    mount_submission(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&mock_server)
        .await;

    let err = create_engine(&mock_server, fast_policy(4))
        .scan_url("http://example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::PollTimeout { attempts: 4 }));
    assert_eq!(analysis_requests(&mock_server).await, 4);
}

#[tokio::test]
async fn test_rejected_api_key_aborts_polling() {
    let mock_server = MockServer::start().await;
    mount_submission(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": "WrongCredentialsError", "message": "Wrong API key"}
        })))
        .mount(&mock_server)
        .await;

    let err = create_engine(&mock_server, fast_policy(10))
        .scan_url("http://example.com", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Upstream { status: 401, .. }));
    assert_eq!(analysis_requests(&mock_server).await, 1);
}

#[tokio::test]
async fn test_cancelled_scan_stops_polling() {
    let mock_server = MockServer::start().await;
    mount_submission(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_body()))
        .mount(&mock_server)
        .await;

    let engine = create_engine(
        &mock_server,
        PollPolicy {
            max_attempts: 10,
            interval: Duration::from_secs(60),
        },
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = engine
        .scan_url("http://example.com", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Cancelled));
    assert_eq!(analysis_requests(&mock_server).await, 1);
}

#[tokio::test]
async fn test_check_domain_against_reputation_api() {
    let scan_server = MockServer::start().await;
    let reputation_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/domainbl"))
        .and(query_param("key", "rep-key"))
        .and(query_param("host", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "risk_score": {"result": 80},
            "blacklists": {"detections": 6, "engines_count": 40},
            "domain_info": {"domain_age_in_years": 0},
            "server_details": {"country_name": "Netherlands"}
        })))
        .expect(1)
        .mount(&reputation_server)
        .await;

    let reputation = ReputationApiClient::new(
        format!("{}/domainbl", reputation_server.uri()),
        "rep-key",
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = create_engine(&scan_server, fast_policy(1))
        .with_reputation_source(Arc::new(reputation));

    let verdict = engine.check_domain("example.com").await.unwrap();

    assert_eq!(verdict.assessment.security_score, 20);
    assert_eq!(verdict.assessment.status, ReputationStatus::Unsafe);
    assert!(verdict.assessment.synopsis.long.contains("confirmed malicious"));
    assert_eq!(verdict.reputation.country.as_deref(), Some("Netherlands"));
}

#[tokio::test]
async fn test_engine_from_config_targets_configured_base_url() {
    let mock_server = MockServer::start().await;
    mount_submission(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/analyses/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"attributes": {"status": "completed", "stats": {"malicious": 9, "harmless": 5}}}
        })))
        .mount(&mock_server)
        .await;

    let vars = [
        (Config::SCAN_API_KEY, "test-api-key".to_string()),
        (Config::SCAN_BASE_URL, mock_server.uri()),
        (Config::POLL_INTERVAL_MS, "10".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let config = Config::from_vars(vars).unwrap();

    let verdict = ReputationEngine::from_config(&config)
        .unwrap()
        .scan_url("http://malware.example", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(verdict.safety, Safety::Unsafe);
}
