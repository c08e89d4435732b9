//! Retrying reads against a mock edge.

use std::sync::Arc;
use std::time::Duration;

use edge_sdk::{
    AuthenticatedHttpClient, FetchOutcome, RetryConfig, RetryingFetcher, StaticTokenProvider,
};
use serde::Deserialize;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct App {
    name: String,
}

fn fetcher(server: &MockServer) -> RetryingFetcher {
    let client = AuthenticatedHttpClient::from_parts(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Arc::new(StaticTokenProvider::new("abc123")),
    );
    RetryingFetcher::new(
        client,
        RetryConfig::default().with_delay(Duration::from_millis(10)),
    )
}

#[tokio::test]
async fn test_fetch_list_returns_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apps"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"apps":[{"name":"inv1"}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome: FetchOutcome<App> = fetcher(&server).fetch_list("/apps", "apps").await;

    assert_eq!(
        outcome,
        FetchOutcome {
            items: vec![App { name: "inv1".into() }],
            error: None,
            attempts: 1,
        }
    );
}

#[tokio::test]
async fn test_fetch_list_recovers_after_two_failures() {
    let server = MockServer::start().await;
    Mock::given(path("/apps"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"boom"}"#))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/apps"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"apps":[{"name":"inv1"}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome: FetchOutcome<App> = fetcher(&server).fetch_list("/apps", "apps").await;

    assert_eq!(outcome.items, vec![App { name: "inv1".into() }]);
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn test_fetch_list_degrades_after_three_failures() {
    let server = MockServer::start().await;
    Mock::given(path("/apps"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"boom"}"#))
        .expect(3)
        .mount(&server)
        .await;

    let outcome: FetchOutcome<App> = fetcher(&server).fetch_list("/apps", "apps").await;

    assert!(outcome.items.is_empty());
    assert!(outcome.error.is_some_and(|e| !e.is_empty()));
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn test_missing_field_is_empty_success() {
    let server = MockServer::start().await;
    Mock::given(path("/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"count":0}"#))
        .expect(1)
        .mount(&server)
        .await;

    let outcome: FetchOutcome<App> = fetcher(&server).fetch_list("/apps", "apps").await;

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_rejected_token_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/apps"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Unauthorized"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let outcome: FetchOutcome<App> = fetcher(&server).fetch_list("/apps", "apps").await;

    assert!(outcome.items.is_empty());
    assert!(outcome.error.is_some());
    assert_eq!(outcome.attempts, 1);
}
