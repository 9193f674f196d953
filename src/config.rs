use crate::api::models::{CredentialState, LegacyCredentials};
use crate::api::resilience::{ResilienceConfig, ResilienceConfigBuilder, RetryConfig};
use crate::api::CommerceClient;
use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of every environment variable read by [`ClientConfig::from_env`]
const ENV_PREFIX: &str = "COMMERCE_";

/// Connection settings for one tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub token_url: Option<String>,
    pub application_id: String,
    pub shared_secret: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub legacy: Option<LegacySettings>,
    #[serde(default)]
    pub resilience: ResilienceSettings,
}

/// Developer credentials for the legacy token exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySettings {
    pub developer_key: String,
    pub password: String,
    pub account_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Optional overrides on top of a resilience preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceSettings {
    /// `default`, `conservative` or `disabled`
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub read_retries: Option<u32>,
    #[serde(default)]
    pub write_retries: Option<u32>,
    #[serde(default)]
    pub backoff_base_ms: Option<u64>,
    #[serde(default)]
    pub rate_limiting: Option<bool>,
    #[serde(default)]
    pub min_batch_size: Option<usize>,
    #[serde(default)]
    pub max_batch_size: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub page_fan_out: Option<usize>,
    #[serde(default)]
    pub export_poll_secs: Option<u64>,
    #[serde(default)]
    pub request_logging: Option<bool>,
}

impl ResilienceSettings {
    pub fn to_config(&self) -> Result<ResilienceConfig> {
        let base = match self.preset.as_deref().unwrap_or("default") {
            "default" => ResilienceConfig::default(),
            "conservative" => ResilienceConfig::conservative(),
            "disabled" => ResilienceConfig::disabled(),
            other => bail!("Unknown resilience preset '{}'", other),
        };

        let mut builder = ResilienceConfigBuilder::from_config(base.clone());
        if let Some(retry_attempts) = self.read_retries {
            builder = builder.read_retry(RetryConfig {
                retry_attempts,
                ..base.read_retry.clone()
            });
        }
        if let Some(retry_attempts) = self.write_retries {
            builder = builder.write_retry(RetryConfig {
                retry_attempts,
                ..base.write_retry.clone()
            });
        }
        if let Some(ms) = self.backoff_base_ms {
            builder = builder.backoff_base(Duration::from_millis(ms));
        }
        if let Some(enabled) = self.rate_limiting {
            builder = builder.enable_rate_limiting(enabled);
        }
        if self.min_batch_size.is_some() || self.max_batch_size.is_some() {
            builder = builder.batch_size_bounds(
                self.min_batch_size.unwrap_or(base.batch.min_batch_size),
                self.max_batch_size.unwrap_or(base.batch.max_batch_size),
            );
        }
        if let Some(size) = self.page_size {
            builder = builder.default_page_size(size);
        }
        if let Some(fan_out) = self.page_fan_out {
            builder = builder.page_fan_out(fan_out);
        }
        if let Some(secs) = self.export_poll_secs {
            builder = builder.export_poll_interval(Duration::from_secs(secs));
        }
        if let Some(enabled) = self.request_logging {
            builder = builder.request_logging(enabled);
        }

        Ok(builder.build())
    }
}

impl ClientConfig {
    /// `<config dir>/commerce-client/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("commerce-client")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".commerce-client")
        };
        Ok(config_dir.join("config.toml"))
    }

    /// Load from an explicit file, the environment, or the default config file, in that order
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        dotenvy::dotenv().ok();
        if std::env::var(format!("{}BASE_URL", ENV_PREFIX)).is_ok() {
            debug!("Using {}* environment variables", ENV_PREFIX);
            return Self::from_env();
        }

        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `COMMERCE_*` variables, loading `.env` first when present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup, e.g. the process environment
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.is_empty());
        let required = |name: &str| {
            var(name).with_context(|| format!("Missing environment variable {}{}", ENV_PREFIX, name))
        };
        let parsed = |name: &str| -> Result<Option<u32>> {
            var(name)
                .map(|v| v.parse::<u32>().with_context(|| format!("Invalid {}{}: {}", ENV_PREFIX, name, v)))
                .transpose()
        };

        let legacy = match var("DEVELOPER_KEY") {
            Some(developer_key) => Some(LegacySettings {
                developer_key,
                password: required("DEVELOPER_PASSWORD")?,
                account_id: required("ACCOUNT_ID")?,
                scopes: var("SCOPES")
                    .map(|s| s.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
            }),
            None => None,
        };

        let config = Self {
            base_url: required("BASE_URL")?,
            token_url: var("TOKEN_URL"),
            application_id: required("APPLICATION_ID")?,
            shared_secret: required("SHARED_SECRET")?,
            access_token: var("ACCESS_TOKEN"),
            refresh_token: var("REFRESH_TOKEN"),
            account_id: var("ACCOUNT_ID"),
            legacy,
            resilience: ResilienceSettings {
                preset: var("RESILIENCE_PRESET"),
                read_retries: parsed("READ_RETRIES")?,
                write_retries: parsed("WRITE_RETRIES")?,
                ..ResilienceSettings::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        url::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url '{}'", self.base_url))?;
        Ok(())
    }

    pub fn credential_state(&self) -> CredentialState {
        let mut state = CredentialState::new(&self.application_id, &self.shared_secret);
        if let Some(token) = &self.access_token {
            state = state.with_access_token(token, None);
        }
        if let Some(refresh_token) = &self.refresh_token {
            state = state.with_refresh_token(refresh_token);
        }
        state
    }

    pub fn legacy_credentials(&self) -> Option<LegacyCredentials> {
        self.legacy.as_ref().map(|legacy| LegacyCredentials {
            developer_key: legacy.developer_key.clone(),
            password: legacy.password.clone(),
            account_id: legacy.account_id.clone(),
            scopes: legacy.scopes.clone(),
        })
    }

    /// Build a client from these settings
    pub fn build_client(&self) -> Result<CommerceClient> {
        let mut builder = CommerceClient::builder(&self.base_url, self.credential_state())
            .resilience(self.resilience.to_config()?);
        if let Some(token_url) = &self.token_url {
            builder = builder.token_url(token_url);
        }
        if let Some(account_id) = &self.account_id {
            builder = builder.account_id(account_id);
        }
        if let Some(legacy) = self.legacy_credentials() {
            builder = builder.legacy_credentials(legacy);
        }

        let client = builder.build()?;
        info!("Client ready for {}", self.base_url);
        Ok(client)
    }
}
