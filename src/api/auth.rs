//! Credential lifecycle: bearer header and single-flight token refresh

use super::constants::grants;
use super::error::{ApiError, ApiResult};
use super::models::{CredentialState, LegacyCredentials, RefreshGrant, TokenResponse};
use arc_swap::ArcSwap;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Holds the current bearer token and refreshes it at most once per expiry
///
/// Readers never block: the state is swapped atomically. Refreshes are
/// serialized by `refresh_gate`, and a caller whose token was already replaced
/// while it waited returns without calling the token endpoint again.
#[derive(Debug)]
pub struct CredentialManager {
    http_client: reqwest::Client,
    token_url: String,
    state: ArcSwap<CredentialState>,
    legacy: Option<LegacyCredentials>,
    refresh_gate: Mutex<()>,
    timeout: Duration,
    cancel: CancellationToken,
    token_requests: AtomicU64,
}

impl CredentialManager {
    pub fn new(
        http_client: reqwest::Client,
        token_url: impl Into<String>,
        state: CredentialState,
    ) -> Self {
        Self {
            http_client,
            token_url: token_url.into(),
            state: ArcSwap::from_pointee(state),
            legacy: None,
            refresh_gate: Mutex::new(()),
            timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
            token_requests: AtomicU64::new(0),
        }
    }

    /// Legacy developer credentials, used when no refresh token is stored
    pub fn with_legacy_credentials(mut self, legacy: LegacyCredentials) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// `Authorization` header value for the current token
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.state.load().access_token)
    }

    pub fn access_token(&self) -> String {
        self.state.load().access_token.clone()
    }

    /// Current credential state, e.g. for an external persistence layer
    pub fn snapshot(&self) -> Arc<CredentialState> {
        self.state.load_full()
    }

    /// True when the stored token is missing or past its expiry
    pub fn needs_refresh(&self) -> bool {
        self.state.load().is_expired(Utc::now())
    }

    /// Number of round trips made to the token endpoint
    pub fn token_requests(&self) -> u64 {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// Refresh the current token
    pub async fn refresh(&self) -> ApiResult<()> {
        let current = self.access_token();
        self.refresh_if_stale(&current).await
    }

    /// Refresh unless another caller already replaced `seen_token`
    pub async fn refresh_if_stale(&self, seen_token: &str) -> ApiResult<()> {
        let _guard = self.lock_gate().await?;

        if self.state.load().access_token != seen_token {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(());
        }

        let grant = self.select_grant()?;
        self.request_token(&grant).await
    }

    /// Exchange the legacy developer credentials for a token and refresh token
    pub async fn bootstrap_legacy(&self) -> ApiResult<()> {
        let legacy = self
            .legacy
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("no legacy credentials configured".into()))?;

        let _guard = self.lock_gate().await?;
        self.request_token(&RefreshGrant::Soap(legacy)).await
    }

    async fn lock_gate(&self) -> ApiResult<tokio::sync::MutexGuard<'_, ()>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            guard = self.refresh_gate.lock() => Ok(guard),
        }
    }

    fn select_grant(&self) -> ApiResult<RefreshGrant> {
        let state = self.state.load();
        if state.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) {
            return Ok(RefreshGrant::RefreshToken);
        }
        match &self.legacy {
            Some(legacy) => Ok(RefreshGrant::Soap(legacy.clone())),
            None => Err(ApiError::Unauthorized(
                "no refresh token or legacy credentials available".into(),
            )),
        }
    }

    fn grant_form(&self, grant: &RefreshGrant) -> Vec<(&'static str, String)> {
        match grant {
            RefreshGrant::RefreshToken => vec![
                ("grant_type", grants::REFRESH_TOKEN.to_string()),
                (
                    "refresh_token",
                    self.state.load().refresh_token.clone().unwrap_or_default(),
                ),
            ],
            RefreshGrant::Soap(legacy) => vec![
                ("grant_type", grants::SOAP.to_string()),
                ("developer_key", legacy.developer_key.clone()),
                ("password", legacy.password.clone()),
                ("account_id", legacy.account_id.clone()),
                ("scope", legacy.scopes.join(" ")),
            ],
        }
    }

    /// Post the grant with basic auth and install the returned token
    async fn request_token(&self, grant: &RefreshGrant) -> ApiResult<()> {
        let grant_name = match grant {
            RefreshGrant::RefreshToken => grants::REFRESH_TOKEN,
            RefreshGrant::Soap(_) => grants::SOAP,
        };
        info!("Requesting access token ({} grant)", grant_name);

        let form = self.grant_form(grant);
        let state = self.state.load_full();
        self.token_requests.fetch_add(1, Ordering::SeqCst);

        let send = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&state.application_id, Some(&state.shared_secret))
            .timeout(self.timeout)
            .form(&form)
            .send();

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            response = send => response
                .map_err(|e| ApiError::Unauthorized(format!("token request failed: {}", e)))?,
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("token response unreadable: {}", e)))?;

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ApiError::Unauthorized(format!("token response unparsable (HTTP {}): {}", status, e))
        })?;

        if let Some(message) = token.error_message() {
            warn!("Token endpoint rejected {} grant: {}", grant_name, message);
            return Err(ApiError::Unauthorized(message));
        }

        if !status.is_success() {
            return Err(ApiError::Unauthorized(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let refreshed = state
            .refreshed(&token, Utc::now())
            .ok_or_else(|| ApiError::Unauthorized("token response has no access_token".into()))?;

        info!(
            "Access token refreshed, expires at {:?}",
            refreshed.access_token_expiry_utc
        );
        self.state.store(Arc::new(refreshed));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> CredentialManager {
        CredentialManager::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.uri()),
            CredentialState::new("app-id", "shared-secret")
                .with_access_token("old-token", None)
                .with_refresh_token("refresh-1"),
        )
    }

    #[tokio::test]
    async fn test_refresh_token_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-token",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server);
        manager.refresh().await.unwrap();

        assert_eq!(manager.auth_header(), "Bearer new-token");
        assert!(!manager.needs_refresh());
        assert_eq!(manager.snapshot().refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_error_field_fails_without_updating_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let manager = manager(&server);
        let error = manager.refresh().await.unwrap_err();

        assert!(matches!(error, ApiError::Unauthorized(ref m) if m == "invalid_grant"));
        assert_eq!(manager.auth_header(), "Bearer old-token");
    }

    #[tokio::test]
    async fn test_stale_token_skips_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server);
        manager.refresh_if_stale("some-older-token").await.unwrap();
        assert_eq!(manager.token_requests(), 0);
    }

    #[tokio::test]
    async fn test_legacy_grant_bootstraps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=soap"))
            .and(body_string_contains("developer_key=dev-key"))
            .and(body_string_contains("account_id=acct-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "soap-token",
                "expires_in": 3600,
                "refresh_token": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = CredentialManager::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.uri()),
            CredentialState::new("app-id", "shared-secret"),
        )
        .with_legacy_credentials(LegacyCredentials {
            developer_key: "dev-key".into(),
            password: "dev-pass".into(),
            account_id: "acct-1".into(),
            scopes: vec!["orders".into(), "inventory".into()],
        });

        manager.refresh().await.unwrap();

        assert_eq!(manager.access_token(), "soap-token");
        assert_eq!(manager.snapshot().refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_no_grant_available() {
        let server = MockServer::start().await;
        let manager = CredentialManager::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.uri()),
            CredentialState::new("app-id", "shared-secret"),
        );

        assert!(matches!(manager.refresh().await, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_cancelled_refresh_releases_gate() {
        let server = MockServer::start().await;
        let cancel = CancellationToken::new();
        let manager = manager(&server).with_cancellation(cancel.clone());
        cancel.cancel();

        assert!(matches!(manager.refresh().await, Err(ApiError::Cancelled)));
        assert!(manager.refresh_gate.try_lock().is_ok());
    }
}
