//! Cancellation of in-flight requests, backoff sleeps and limiter waits

mod common;

use commerce_client::api::resilience::ResilienceConfigBuilder;
use commerce_client::api::{CommerceClient, RateLimitConfig, RetryConfig};
use common::{credentials, fast_config};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cancellable_client(server: &MockServer, cancel: CancellationToken) -> CommerceClient {
    let config = ResilienceConfigBuilder::from_config(fast_config())
        .read_retry(RetryConfig {
            retry_attempts: 5,
            backoff_base: Duration::from_secs(30),
        })
        .build();
    CommerceClient::builder(server.uri(), credentials())
        .resilience(config)
        .cancellation(cancel)
        .build()
        .unwrap()
}

fn cancel_after(cancel: &CancellationToken, delay: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cancel.cancel();
    });
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Id": 1}))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let client = cancellable_client(&server, cancel.clone());
    cancel_after(&cancel, Duration::from_millis(50));

    let started = Instant::now();
    let error = client.get_json::<Value>("Products(1)").await.unwrap_err();

    assert!(error.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let client = cancellable_client(&server, cancel.clone());
    cancel_after(&cancel, Duration::from_millis(100));

    let started = Instant::now();
    let error = client.get_json::<Value>("Products(1)").await.unwrap_err();

    assert!(error.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_releases_limiter_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let config = ResilienceConfigBuilder::from_config(fast_config())
        .single_limit(RateLimitConfig {
            max_concurrent: 1,
            permits_per_window: 10,
            window: Duration::from_secs(10),
            enabled: true,
        })
        .build();
    let client = CommerceClient::builder(server.uri(), credentials())
        .resilience(config)
        .cancellation(cancel.clone())
        .build()
        .unwrap();

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.get_json::<Value>("Products(1)").await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.get_json::<Value>("Products(1)").await }
    });
    cancel_after(&cancel, Duration::from_millis(100));

    assert!(first.await.unwrap().unwrap_err().is_cancelled());
    assert!(second.await.unwrap().unwrap_err().is_cancelled());
    assert_eq!(client.single_limiter_stats().available_slots, 1);
}
