use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::fmt;

/// Credentials and the current bearer token of one client instance
///
/// Never persisted by this crate; callers that want to keep the refreshed
/// token read it back through [`crate::api::CredentialManager::snapshot`].
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialState {
    pub application_id: String,
    pub shared_secret: String,
    pub access_token: String,
    pub access_token_expiry_utc: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
}

impl CredentialState {
    pub fn new(application_id: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            shared_secret: shared_secret.into(),
            access_token: String::new(),
            access_token_expiry_utc: None,
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_access_token(
        mut self,
        access_token: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        self.access_token = access_token.into();
        self.access_token_expiry_utc = expiry;
        self
    }

    /// True when there is no token yet or its expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self
                .access_token_expiry_utc
                .is_some_and(|expiry| expiry <= now)
    }

    /// Copy of this state carrying a freshly issued token
    pub(crate) fn refreshed(&self, token: &TokenResponse, now: DateTime<Utc>) -> Option<Self> {
        let access_token = token.access_token.as_deref().filter(|t| !t.is_empty())?;
        Some(Self {
            access_token: access_token.to_string(),
            access_token_expiry_utc: token
                .expires_in
                .and_then(ChronoDuration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime)),
            refresh_token: token
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            ..self.clone()
        })
    }
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialState")
            .field("application_id", &self.application_id)
            .field("shared_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("access_token_expiry_utc", &self.access_token_expiry_utc)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Long-lived developer credentials of the legacy SOAP scheme
#[derive(Clone, PartialEq, Eq)]
pub struct LegacyCredentials {
    pub developer_key: String,
    pub password: String,
    pub account_id: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for LegacyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyCredentials")
            .field("developer_key", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Grant used to obtain a new access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshGrant {
    /// Standard flow using the stored refresh token
    RefreshToken,
    /// Legacy exchange that bootstraps a refresh token
    Soap(LegacyCredentials),
}

/// Token endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// The server's error, when the `error` field is present and non-empty
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_deref().filter(|e| !e.is_empty())?;
        Some(match self.error_description.as_deref() {
            Some(description) if !description.is_empty() => format!("{}: {}", error, description),
            _ => error.to_string(),
        })
    }
}
