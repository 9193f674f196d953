//! Transport resilience: retries, rate limiting, timeouts and monitoring
//!
//! Every policy object here is owned by a client instance; there is no
//! process-wide state.

pub mod config;
pub mod cooldown;
pub mod logging;
pub mod rate_limiter;
pub mod retry;
pub mod timeouts;

pub use config::{
    BatchConfig, ExportConfig, LogLevel, MonitoringConfig, PagingConfig, RateLimitConfig,
    ResilienceConfig, ResilienceConfigBuilder,
};
pub use logging::{ApiLogger, OperationContext};
pub use rate_limiter::{RateLimitPermit, RateLimiter, RateLimiterStats};
pub use retry::{RetryConfig, RetryPolicy, sleep_or_cancel};
pub use timeouts::{OperationKind, TimeoutRegistry};
