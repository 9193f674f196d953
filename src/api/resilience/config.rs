//! Resilience configuration with builder pattern
//!
//! One `ResilienceConfig` is owned by each client instance. Nothing here is
//! global, so tests can build isolated clients with tiny delays.

use super::retry::RetryConfig;
use super::timeouts::{OperationKind, TimeoutRegistry};
use std::time::Duration;

/// Resilience configuration for a client instance
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Retry budget for read calls (GET, paging, export polling)
    pub read_retry: RetryConfig,
    /// Retry budget for mutating calls
    pub write_retry: RetryConfig,
    /// Limiter gating single-entity and page calls
    pub single_limit: RateLimitConfig,
    /// Limiter gating `$batch` calls
    pub batch_limit: RateLimitConfig,
    pub timeouts: TimeoutRegistry,
    pub batch: BatchConfig,
    pub paging: PagingConfig,
    pub export: ExportConfig,
    pub monitoring: MonitoringConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed in flight at once
    pub max_concurrent: usize,
    /// Admissions allowed per rolling window
    pub permits_per_window: u32,
    pub window: Duration,
    pub enabled: bool,
}

/// Bounds of the adaptive batch ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub min_batch_size: usize,
    pub max_batch_size: usize,
}

/// Page fan-out settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingConfig {
    /// Page size requested when the caller does not give one
    pub default_page_size: usize,
    /// Concurrent page fetches after page 1; 1 means sequential
    pub page_fan_out: usize,
    /// Concurrency of `process_with_pages`
    pub process_fan_out: usize,
}

/// Bulk export polling and path-selection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub poll_interval: Duration,
    /// Give up after this many polls
    pub max_polls: u32,
    /// Average seconds to serve one batch of key lookups
    pub avg_request_secs: f64,
    /// Average seconds for an export job to produce its file
    pub avg_export_secs: f64,
}

/// Monitoring and logging configuration
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub correlation_ids: bool,
    pub request_logging: bool,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            read_retry: RetryConfig::reads(),
            write_retry: RetryConfig::writes(),
            single_limit: RateLimitConfig::single_calls(),
            batch_limit: RateLimitConfig::batch_calls(),
            timeouts: TimeoutRegistry::default(),
            batch: BatchConfig::default(),
            paging: PagingConfig::default(),
            export: ExportConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl RateLimitConfig {
    /// Four slots, twelve admissions per ten-second window
    pub fn single_calls() -> Self {
        Self {
            max_concurrent: 4,
            permits_per_window: 12,
            window: Duration::from_secs(10),
            enabled: true,
        }
    }

    /// One slot; each batch is worth up to a hundred requests of the tenant budget
    pub fn batch_calls() -> Self {
        Self {
            max_concurrent: 1,
            permits_per_window: 3,
            window: Duration::from_secs(10),
            enabled: true,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            max_concurrent: usize::MAX,
            permits_per_window: u32::MAX,
            window: Duration::from_secs(1),
            enabled: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_batch_size: 20,
            max_batch_size: 100,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            default_page_size: 100,
            page_fan_out: 1,
            process_fan_out: cpus * 12,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            max_polls: 240,
            avg_request_secs: 5.0,
            avg_export_secs: 600.0,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            correlation_ids: true,
            request_logging: true,
            log_level: LogLevel::Info,
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Conservative config for busy tenants
    pub fn conservative() -> Self {
        Self {
            single_limit: RateLimitConfig {
                max_concurrent: 2,
                permits_per_window: 6,
                window: Duration::from_secs(10),
                enabled: true,
            },
            batch: BatchConfig {
                min_batch_size: 20,
                max_batch_size: 50,
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Warn,
                ..MonitoringConfig::default()
            },
            ..Self::default()
        }
    }

    /// Disable retries, limits and delays (for testing)
    pub fn disabled() -> Self {
        Self {
            read_retry: RetryConfig::none(),
            write_retry: RetryConfig::none(),
            single_limit: RateLimitConfig::unlimited(),
            batch_limit: RateLimitConfig::unlimited(),
            export: ExportConfig {
                poll_interval: Duration::ZERO,
                ..ExportConfig::default()
            },
            monitoring: MonitoringConfig {
                correlation_ids: false,
                request_logging: false,
                log_level: LogLevel::Error,
            },
            ..Self::default()
        }
    }
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ResilienceConfig) -> Self {
        Self { config }
    }

    pub fn read_retry(mut self, retry: RetryConfig) -> Self {
        self.config.read_retry = retry;
        self
    }

    pub fn write_retry(mut self, retry: RetryConfig) -> Self {
        self.config.write_retry = retry;
        self
    }

    /// Set the backoff unit for both read and write policies
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.config.read_retry.backoff_base = base;
        self.config.write_retry.backoff_base = base;
        self
    }

    pub fn single_limit(mut self, limit: RateLimitConfig) -> Self {
        self.config.single_limit = limit;
        self
    }

    pub fn batch_limit(mut self, limit: RateLimitConfig) -> Self {
        self.config.batch_limit = limit;
        self
    }

    /// Enable/disable both limiters
    pub fn enable_rate_limiting(mut self, enabled: bool) -> Self {
        self.config.single_limit.enabled = enabled;
        self.config.batch_limit.enabled = enabled;
        self
    }

    pub fn timeout(mut self, kind: OperationKind, timeout: Duration) -> Self {
        self.config.timeouts.set(kind, timeout);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.set_default(timeout);
        self
    }

    pub fn batch_size_bounds(mut self, min: usize, max: usize) -> Self {
        self.config.batch = BatchConfig {
            min_batch_size: min.max(1),
            max_batch_size: max.max(min.max(1)),
        };
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.paging.default_page_size = size.max(1);
        self
    }

    /// Concurrent page fetches after the first page
    pub fn page_fan_out(mut self, width: usize) -> Self {
        self.config.paging.page_fan_out = width.max(1);
        self
    }

    pub fn process_fan_out(mut self, width: usize) -> Self {
        self.config.paging.process_fan_out = width.max(1);
        self
    }

    pub fn export_poll_interval(mut self, interval: Duration) -> Self {
        self.config.export.poll_interval = interval;
        self
    }

    pub fn export_max_polls(mut self, polls: u32) -> Self {
        self.config.export.max_polls = polls.max(1);
        self
    }

    pub fn export_timings(mut self, avg_request_secs: f64, avg_export_secs: f64) -> Self {
        self.config.export.avg_request_secs = avg_request_secs;
        self.config.export.avg_export_secs = avg_export_secs;
        self
    }

    pub fn monitoring_config(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.monitoring.log_level = level;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResilienceConfig::default();

        assert_eq!(config.read_retry.retry_attempts, 10);
        assert_eq!(config.write_retry.retry_attempts, 3);
        assert_eq!(config.single_limit.max_concurrent, 4);
        assert_eq!(config.batch_limit.max_concurrent, 1);
        assert!(config.batch_limit.permits_per_window < config.single_limit.permits_per_window);
        assert_eq!(config.batch.min_batch_size, 20);
        assert_eq!(config.batch.max_batch_size, 100);
        assert_eq!(config.paging.page_fan_out, 1);
        assert_eq!(config.export.poll_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_disabled_config() {
        let config = ResilienceConfig::disabled();

        assert_eq!(config.read_retry.retry_attempts, 0);
        assert!(!config.single_limit.enabled);
        assert!(!config.batch_limit.enabled);
        assert!(!config.monitoring.request_logging);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ResilienceConfig::builder()
            .backoff_base(Duration::from_millis(1))
            .enable_rate_limiting(false)
            .batch_size_bounds(10, 50)
            .page_fan_out(4)
            .timeout(OperationKind::Page, Duration::from_secs(5))
            .log_level(LogLevel::Debug)
            .build();

        assert_eq!(config.read_retry.backoff_base, Duration::from_millis(1));
        assert_eq!(config.write_retry.backoff_base, Duration::from_millis(1));
        assert!(!config.single_limit.enabled);
        assert_eq!(config.batch.max_batch_size, 50);
        assert_eq!(config.paging.page_fan_out, 4);
        assert_eq!(config.timeouts.get(OperationKind::Page), Duration::from_secs(5));
    }

    #[test]
    fn test_batch_bounds_are_ordered() {
        let config = ResilienceConfig::builder().batch_size_bounds(40, 10).build();
        assert_eq!(config.batch.min_batch_size, 40);
        assert_eq!(config.batch.max_batch_size, 40);
    }
}
