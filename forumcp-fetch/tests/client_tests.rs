//! Direct-path client tests against a mock forum.

use std::time::Duration;

use forumcp_core::AuthMode;
use forumcp_fetch::{FetchError, ForumClient, Payload, RetryPolicy};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_initial_delay(Duration::from_millis(10))
}

fn client_for(server: &MockServer) -> ForumClient {
    ForumClient::builder(server.uri())
        .retry(fast_retry())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_json_and_text_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"about": {"title": "Forum"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let about = client.get("/about.json", None).await.unwrap();
    assert_eq!(about.as_json().unwrap()["about"]["title"], "Forum");

    let robots = client.get("/robots.txt", None).await.unwrap();
    assert_eq!(robots, Payload::Text("User-agent: *".into()));
}

#[tokio::test]
async fn test_get_cached_respects_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"categories": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ttl = Duration::from_millis(50);

    client.get_cached("/site.json", ttl, None).await.unwrap();
    client.get_cached("/site.json", ttl, None).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    client.get_cached("/site.json", ttl, None).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    // Plain get never touches the cache.
    client.get("/site.json", None).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_503_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topic_list": {}})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let latest = client.get("/latest.json", None).await.unwrap();

    assert!(latest.as_json().unwrap().get("topic_list").is_some());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_404_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/999.json"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"errors": ["The requested URL or resource could not be found."]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("/t/999.json", None).await.unwrap_err();

    match err {
        FetchError::Http(http) => {
            assert_eq!(http.status, 404);
            assert_eq!(http.message, "HTTP 404 Not Found");
            assert!(http.body.unwrap()["errors"].is_array());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cookies_and_referer_carried_forward() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/csrf.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "_forum_session=abc; path=/; HttpOnly")
                .set_body_json(json!({"csrf": "x"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(header("cookie", "_forum_session=abc"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.headers_for(false);
    assert!(!first.contains("Referer"));

    client.get("/session/csrf.json", None).await.unwrap();
    client.get("/latest.json", None).await.unwrap();
    assert_eq!(client.last_url().unwrap(), format!("{}/latest.json", server.uri()));
}

#[tokio::test]
async fn test_user_api_key_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications.json"))
        .and(header("user-api-key", "uk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"notifications": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ForumClient::builder(server.uri())
        .auth(AuthMode::UserApiKey {
            key: "uk".into(),
            client_id: None,
        })
        .build()
        .unwrap();
    client.get("/notifications.json", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("api-key").is_none());
    assert!(requests[0].headers.get("user-api-client-id").is_none());
}

#[tokio::test]
async fn test_post_sends_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts.json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"topic_id": 7, "raw": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 99, "topic_id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .post("/posts.json", &json!({"topic_id": 7, "raw": "hello"}), None)
        .await
        .unwrap();

    assert_eq!(created.as_json().unwrap()["id"], 99);
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = ForumClient::builder(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = client.get("/slow.json", None).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "got {err}");
    assert!(err.to_string().contains("timed out after 200ms"));
}

#[tokio::test]
async fn test_cancellation_aborts_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = client.get("/slow.json", Some(&token)).await.unwrap_err();
    assert!(matches!(err, FetchError::Cancelled));
}

#[tokio::test]
async fn test_connection_refused_is_connect_error() {
    let client = ForumClient::builder("http://127.0.0.1:9")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = client.get("/latest.json", None).await.unwrap_err();
    assert!(matches!(err, FetchError::Connect { .. }), "got {err}");
}

#[tokio::test]
async fn test_concurrent_requests_share_cookie_jar() {
    let server = MockServer::start().await;
    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/t/{i}.json")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", format!("c{i}={i}; Path=/"))
                    .set_body_json(json!({"id": i})),
            )
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let paths: Vec<String> = (0..8).map(|i| format!("/t/{i}.json")).collect();
    let results = futures::future::join_all(paths.iter().map(|p| client.get(p, None))).await;

    assert!(results.iter().all(Result::is_ok));
    let cookies = client.cookies().snapshot();
    assert_eq!(cookies.len(), 8);
    assert_eq!(cookies.get("c5").map(String::as_str), Some("5"));
}
