use std::sync::{Arc, Barrier};
use std::thread;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use friending_quota::{
    create_router, ApiState, FriendingQuotaConfig, FriendingQuotaManager, QuotaDatabase,
    UnlimitedIdentifiers,
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn setup(
    default_max_allowed: i64,
) -> (TempDir, Arc<FriendingQuotaManager>, FriendingQuotaConfig) {
    let temp = tempdir().expect("failed to create temp dir");
    let config = FriendingQuotaConfig {
        data_dir: temp.path().to_path_buf(),
        default_max_allowed,
        ..FriendingQuotaConfig::default()
    };
    let database =
        Arc::new(QuotaDatabase::new(config.data_dir.clone()).expect("database should open"));
    let manager = Arc::new(FriendingQuotaManager::new(database, &config));
    (temp, manager, config)
}

fn router_for(manager: Arc<FriendingQuotaManager>, config: FriendingQuotaConfig) -> Router {
    create_router(Arc::new(ApiState::new(manager, config)))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_raw(router, method, uri, body.map(|body| body.to_string())).await
}

async fn send_raw(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[test]
fn test_three_grants_then_denial() {
    let (_temp, manager, _config) = setup(10);
    manager.create_quota("alice@example.com", Some(3)).unwrap();

    let results: Vec<bool> = (0..4)
        .map(|_| manager.check_and_increment("alice@example.com").unwrap().granted)
        .collect();
    assert_eq!(results, vec![true, true, true, false]);

    let quota = manager.get_quota("alice@example.com").unwrap().unwrap();
    assert_eq!(quota.total_friended(), 3);
    assert_eq!(quota.remaining_quota(), 0);
}

#[test]
fn test_exhausted_quota_stays_denied() {
    let (_temp, manager, _config) = setup(10);
    manager.create_quota("bob@example.com", Some(1)).unwrap();
    assert!(manager.check_and_increment("bob@example.com").unwrap().granted);

    for _ in 0..10 {
        let decision = manager.check_and_increment("bob@example.com").unwrap();
        assert!(!decision.granted);
        assert_eq!(decision.quota.total_friended(), 1);
    }
}

#[test]
fn test_configured_exemptions_replace_legacy_set() {
    let temp = tempdir().unwrap();
    let config = FriendingQuotaConfig {
        data_dir: temp.path().to_path_buf(),
        unlimited_emails: UnlimitedIdentifiers::parse_list("qa@example.com"),
        ..FriendingQuotaConfig::default()
    };
    let database = Arc::new(QuotaDatabase::new(config.data_dir.clone()).unwrap());
    let manager = FriendingQuotaManager::new(database, &config);
    manager.create_quota("qa@example.com", Some(0)).unwrap();
    manager.create_quota("test@test.com", Some(0)).unwrap();

    assert!(manager.check_and_increment("qa@example.com").unwrap().granted);
    assert!(!manager.check_and_increment("test@test.com").unwrap().granted);
}

#[test]
fn test_concurrent_increments_never_overrun() {
    let (_temp, manager, _config) = setup(10);
    manager.create_quota("race@example.com", Some(1)).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.check_and_increment("race@example.com").unwrap().granted
            })
        })
        .collect();

    let mut results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    results.sort();
    assert_eq!(results, vec![false, true]);
    assert_eq!(manager.remaining_quota("race@example.com").unwrap(), 0);
}

#[test]
fn test_many_threads_share_one_quota() {
    let (_temp, manager, _config) = setup(10);
    manager.create_quota("busy@example.com", Some(5)).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                manager
                    .check_and_increment("busy@example.com")
                    .unwrap()
                    .granted
            })
        })
        .collect();

    let granted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|granted| *granted)
        .count();
    assert_eq!(granted, 5);

    let quota = manager.get_quota("busy@example.com").unwrap().unwrap();
    assert_eq!(quota.total_friended(), 5);
}

#[test]
fn test_managers_sharing_data_dir_see_each_others_usage() {
    let (temp, first, config) = setup(10);
    let second_database = Arc::new(QuotaDatabase::new(temp.path().to_path_buf()).unwrap());
    let second = FriendingQuotaManager::new(second_database, &config);

    first.create_quota("shared@example.com", Some(3)).unwrap();
    assert_eq!(second.remaining_quota("shared@example.com").unwrap(), 3);

    for _ in 0..3 {
        assert!(first.check_and_increment("shared@example.com").unwrap().granted);
    }

    assert_eq!(second.remaining_quota("shared@example.com").unwrap(), 0);
    let quota = second.get_quota("shared@example.com").unwrap().unwrap();
    assert_eq!(quota.total_friended(), 3);
    assert!(!second.check_and_increment("shared@example.com").unwrap().granted);

    second.set_max_allowed("shared@example.com", 5).unwrap();
    assert_eq!(first.remaining_quota("shared@example.com").unwrap(), 2);
    assert_eq!(
        first.ensure_quota("shared@example.com", None).unwrap().max_allowed(),
        5
    );
}

#[test]
fn test_separate_emails_are_isolated() {
    let (_temp, manager, _config) = setup(1);

    assert!(manager.check_and_increment("one@example.com").unwrap().granted);
    assert!(manager.check_and_increment("two@example.com").unwrap().granted);
    assert!(!manager.check_and_increment("one@example.com").unwrap().granted);
    assert_eq!(manager.list_quotas().unwrap().len(), 2);
}

#[tokio::test]
async fn test_http_check_flow() {
    let (_temp, manager, config) = setup(10);
    let router = router_for(manager, config);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota",
        Some(json!({"email": "carol@example.com", "max_allowed": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["remaining"], 1);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some(json!({"email": "carol@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["granted"], true);
    assert_eq!(body["remaining"], 0);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some(json!({"email": "carol@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["granted"], false);
    assert_eq!(body["quota"]["total_friended"], 1);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/friending-quota/carol@example.com/remaining",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn test_http_admin_and_errors() {
    let (_temp, manager, config) = setup(10);
    let router = router_for(manager, config);

    let create = json!({"email": "dave@example.com", "max_allowed": 2});
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/friending-quota",
        Some(create.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&router, Method::POST, "/api/friending-quota", Some(create)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "quota_exists");

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/friending-quota/dave@example.com/total-friended",
        Some(json!({"total_friended": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 0);

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/friending-quota/dave@example.com/max-allowed",
        Some(json!({"max_allowed": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], -2);

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/friending-quota/dave@example.com/max-allowed",
        Some(json!({"max_allowed": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_quota_value");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/friending-quota/ghost@example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "quota_not_found");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some(json!({"email": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_email");

    let (status, body) = send(&router, Method::GET, "/api/friending-quota", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_http_legacy_exemption() {
    let (_temp, manager, config) = setup(0);
    let router = router_for(manager, config);

    for _ in 0..3 {
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/friending-quota/check",
            Some(json!({"email": "test@test.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["granted"], true);
        assert_eq!(body["quota"]["total_friended"], 0);
    }

    let (status, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_http_malformed_bodies_get_json_errors() {
    let (_temp, manager, config) = setup(10);
    let router = router_for(manager, config);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some(json!({"email": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/friending-quota",
        Some(json!({"email": "erin@example.com", "max_allowed": "lots"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send_raw(
        &router,
        Method::POST,
        "/api/friending-quota/check",
        Some("not json".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/friending-quota/erin@example.com/max-allowed",
        Some(json!({"max_allowed": 1.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(&router, Method::GET, "/api/friending-quota", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_http_remaining_reports_stored_email() {
    let (_temp, manager, config) = setup(10);
    manager.create_quota("frank@example.com", Some(4)).unwrap();
    let router = router_for(manager, config);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/friending-quota/%20frank@example.com%20/remaining",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "frank@example.com");
    assert_eq!(body["remaining"], 4);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/friending-quota/ghost@example.com/remaining",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "quota_not_found");
}
