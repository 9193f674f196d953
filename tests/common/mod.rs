//! Shared helpers for the wiremock-driven integration tests

#![allow(dead_code)]

use commerce_client::api::{CommerceClient, CredentialState, ResilienceConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BATCH_BOUNDARY: &str = "batchresponse_1";

/// Millisecond backoff, no rate limiting, no poll delay
pub fn fast_config() -> ResilienceConfig {
    ResilienceConfig::builder()
        .backoff_base(Duration::from_millis(1))
        .enable_rate_limiting(false)
        .export_poll_interval(Duration::ZERO)
        .request_logging(false)
        .build()
}

pub fn credentials() -> CredentialState {
    CredentialState::new("app-id", "shared-secret")
        .with_access_token("token-1", None)
        .with_refresh_token("refresh-1")
}

pub fn client(server: &MockServer, config: ResilienceConfig) -> CommerceClient {
    CommerceClient::builder(server.uri(), credentials())
        .account_id("acct-42")
        .resilience(config)
        .build()
        .unwrap()
}

/// Token endpoint issuing `token`, expected to be hit `times` times
pub async fn mount_token(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// One part of a multipart batch response
pub fn response_part(content_id: u32, status: u16, body: &str) -> String {
    format!(
        "--{boundary}\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: {content_id}\r\n\
\r\n\
HTTP/1.1 {status} Status\r\n\
Content-Type: application/json\r\n\
\r\n\
{body}\r\n",
        boundary = BATCH_BOUNDARY,
    )
}

/// Wrap parts into a complete batch response
pub fn batch_response(parts: &[String]) -> ResponseTemplate {
    let body = format!("{}--{}--\r\n", parts.concat(), BATCH_BOUNDARY);
    ResponseTemplate::new(200).set_body_raw(
        body,
        &format!("multipart/mixed; boundary={}", BATCH_BOUNDARY),
    )
}

/// Content-IDs of the parts of a batch request body, in order
pub fn request_content_ids(body: &[u8]) -> Vec<u32> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("Content-ID: "))
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}
