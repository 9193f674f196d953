//! Token refresh behaviour seen through the client

mod common;

use commerce_client::api::{ApiError, CommerceClient, CredentialState};
use common::{client, fast_config, mount_token};
use futures::future::join_all;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_product(server: &MockServer, token: &str, status: u16) {
    let response = match status {
        200 => ResponseTemplate::new(200).set_body_json(json!({"Id": 1})),
        other => ResponseTemplate::new(other),
    };
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_refresh_once() {
    let server = MockServer::start().await;
    mount_product(&server, "token-1", 401).await;
    mount_product(&server, "token-2", 200).await;
    mount_token(&server, "token-2", 1).await;

    let client = client(&server, fast_config());
    let calls = (0..8).map(|_| {
        let client = client.clone();
        async move { client.get_json::<Value>("Products(1)").await }
    });

    for result in join_all(calls).await {
        assert_eq!(result.unwrap()["Id"], 1);
    }
    assert_eq!(client.credentials().token_requests(), 1);
    assert_eq!(client.credentials().auth_header(), "Bearer token-2");
}

#[tokio::test]
async fn test_missing_token_is_fetched_before_sending() {
    let server = MockServer::start().await;
    mount_product(&server, "token-2", 200).await;
    mount_token(&server, "token-2", 1).await;

    let client = CommerceClient::builder(
        server.uri(),
        CredentialState::new("app-id", "shared-secret").with_refresh_token("refresh-1"),
    )
    .resilience(fast_config())
    .build()
    .unwrap();

    let product: Value = client.get_json("Products(1)").await.unwrap();
    assert_eq!(product["Id"], 1);
}

#[tokio::test]
async fn test_second_401_after_refresh_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_token(&server, "token-2", 1).await;

    let client = client(&server, fast_config());
    let error = client.get_json::<Value>("Products(1)").await.unwrap_err();

    assert!(matches!(error.root(), ApiError::Unauthorized(_)));
}

#[tokio::test]
async fn test_token_endpoint_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Products(1)"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_config());
    let error = client.get_json::<Value>("Products(1)").await.unwrap_err();

    assert!(matches!(error.root(), ApiError::Unauthorized(_)));
    assert_eq!(client.credentials().auth_header(), "Bearer token-1");
}
