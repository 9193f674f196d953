//! Resilient client core for the commerce REST API
//!
//! Token lifecycle, rate limiting, retry classification, the `$batch`
//! protocol, OData paging and the bulk export fallback. Everything is owned
//! by a [`CommerceClient`] instance; there is no process-wide state.

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod export;
pub mod models;
pub mod operations;
pub mod query;
pub mod resilience;

pub use auth::CredentialManager;
pub use client::{CommerceClient, CommerceClientBuilder};
pub use error::{ApiError, ApiResult, CallContext, ErrorClass};
pub use export::{ExportJob, ExportStatus, LookupStrategy};
pub use models::{CredentialState, LegacyCredentials, TokenResponse};
pub use operations::{BatchBuilder, BatchCeiling, BatchRequest, BatchResponse, PartResult, RequestPart};
pub use query::{PageState, PagedResult, QueryResponse};
pub use resilience::{
    ApiLogger, LogLevel, MonitoringConfig, OperationKind, RateLimitConfig, RateLimiter,
    RateLimiterStats, ResilienceConfig, RetryConfig, RetryPolicy,
};
