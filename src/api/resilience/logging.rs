//! Structured logging with correlation tracking
//!
//! Emits one JSON document per event through the `log` facade so that every
//! request, retry and throttling decision of one logical call can be joined by
//! its correlation id.

use super::config::{LogLevel, MonitoringConfig};
use super::timeouts::OperationKind;
use log::{debug, error, info, trace, warn};
use serde_json::json;
use std::time::{Duration, Instant};

/// Structured logger for API operations with correlation tracking
#[derive(Debug, Clone)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

/// Context for a single logical API call
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Unique correlation ID for this call
    pub correlation_id: String,
    pub kind: OperationKind,
    /// Endpoint with secrets redacted
    pub endpoint: String,
    pub start_time: Instant,
}

impl OperationContext {
    /// Calculate elapsed time since the call started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl ApiLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    /// Start tracking a new call
    pub fn start_operation(&self, kind: OperationKind, endpoint: &str) -> OperationContext {
        let correlation_id = if self.config.correlation_ids {
            uuid::Uuid::new_v4().to_string()
        } else {
            String::new()
        };

        let context = OperationContext {
            correlation_id,
            kind,
            endpoint: redact_url(endpoint),
            start_time: Instant::now(),
        };

        if self.config.request_logging && self.should_log(&LogLevel::Trace) {
            trace!(
                "API Operation Started: {}",
                json!({
                    "event": "operation_started",
                    "correlation_id": context.correlation_id,
                    "kind": context.kind.as_str(),
                    "endpoint": context.endpoint,
                })
            );
        }

        context
    }

    /// Log an outgoing HTTP request
    pub fn log_request(&self, context: &OperationContext, method: &str, attempt: u32) {
        if !self.config.request_logging || !self.should_log(&LogLevel::Debug) {
            return;
        }

        debug!(
            "HTTP Request: {}",
            json!({
                "event": "http_request",
                "correlation_id": context.correlation_id,
                "kind": context.kind.as_str(),
                "method": method,
                "endpoint": context.endpoint,
                "attempt": attempt,
            })
        );
    }

    /// Log an HTTP response status
    pub fn log_response(&self, context: &OperationContext, status_code: u16, duration: Duration) {
        if !self.config.request_logging || !self.should_log(&LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "http_response",
            "correlation_id": context.correlation_id,
            "kind": context.kind.as_str(),
            "endpoint": context.endpoint,
            "status_code": status_code,
            "duration_ms": duration.as_millis(),
        });

        if status_code >= 400 {
            warn!("HTTP Response (Error): {}", log_data);
        } else {
            debug!("HTTP Response: {}", log_data);
        }
    }

    /// Log a retry decision
    pub fn log_retry(&self, context: &OperationContext, attempt: u32, error: &str, delay: Duration) {
        if !self.should_log(&LogLevel::Warn) {
            return;
        }

        warn!(
            "Retry Attempt: {}",
            json!({
                "event": "retry_attempt",
                "correlation_id": context.correlation_id,
                "kind": context.kind.as_str(),
                "endpoint": context.endpoint,
                "attempt": attempt,
                "error": error,
                "delay_ms": delay.as_millis(),
            })
        );
    }

    /// Log a shrink of the adaptive batch ceiling
    pub fn log_ceiling_shrink(&self, context: &OperationContext, from: usize, to: usize) {
        if !self.should_log(&LogLevel::Warn) {
            return;
        }

        warn!(
            "Batch Ceiling Shrunk: {}",
            json!({
                "event": "batch_ceiling_shrunk",
                "correlation_id": context.correlation_id,
                "from": from,
                "to": to,
            })
        );
    }

    /// Log the outcome of a batch chunk
    pub fn log_batch_chunk(&self, context: &OperationContext, parts: usize, aggregate_status: u16) {
        if !self.should_log(&LogLevel::Info) {
            return;
        }

        info!(
            "Batch Chunk Completed: {}",
            json!({
                "event": "batch_chunk_completed",
                "correlation_id": context.correlation_id,
                "parts": parts,
                "aggregate_status": aggregate_status,
                "duration_ms": context.elapsed().as_millis(),
            })
        );
    }

    /// Log completion of the whole call
    pub fn complete_operation(&self, context: &OperationContext, error: Option<&str>) {
        match error {
            None => {
                if self.config.request_logging && self.should_log(&LogLevel::Debug) {
                    debug!(
                        "API Operation Completed: {}",
                        json!({
                            "event": "operation_completed",
                            "correlation_id": context.correlation_id,
                            "kind": context.kind.as_str(),
                            "endpoint": context.endpoint,
                            "duration_ms": context.elapsed().as_millis(),
                        })
                    );
                }
            }
            Some(message) => {
                if self.should_log(&LogLevel::Error) {
                    error!(
                        "API Operation Failed: {}",
                        json!({
                            "event": "operation_failed",
                            "correlation_id": context.correlation_id,
                            "kind": context.kind.as_str(),
                            "endpoint": context.endpoint,
                            "duration_ms": context.elapsed().as_millis(),
                            "error": message,
                        })
                    );
                }
            }
        }
    }

    /// Check if we should log at the given level
    fn should_log(&self, level: &LogLevel) -> bool {
        match (&self.config.log_level, level) {
            (LogLevel::Error, LogLevel::Error) => true,
            (LogLevel::Warn, LogLevel::Error | LogLevel::Warn) => true,
            (LogLevel::Info, LogLevel::Error | LogLevel::Warn | LogLevel::Info) => true,
            (LogLevel::Debug, LogLevel::Error | LogLevel::Warn | LogLevel::Info | LogLevel::Debug) => true,
            (LogLevel::Trace, _) => true,
            _ => false,
        }
    }
}

/// Replace the value of any `access_token` / `token` query parameter
pub fn redact_url(raw: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };

    if parsed.query().is_none() {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            let lower = key.to_lowercase();
            if lower.contains("token") || lower.contains("secret") {
                (key.into_owned(), "[REDACTED]".to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: LogLevel) -> MonitoringConfig {
        MonitoringConfig {
            correlation_ids: true,
            request_logging: true,
            log_level: level,
        }
    }

    #[test]
    fn test_operation_context_creation() {
        let logger = ApiLogger::new(config(LogLevel::Debug));
        let context = logger.start_operation(
            OperationKind::Batch,
            "https://api.example.com/v1/$batch?access_token=secret",
        );

        assert_eq!(context.kind, OperationKind::Batch);
        assert_eq!(context.correlation_id.len(), 36);
        assert!(!context.endpoint.contains("secret"));
    }

    #[test]
    fn test_correlation_ids_can_be_disabled() {
        let logger = ApiLogger::new(MonitoringConfig {
            correlation_ids: false,
            ..config(LogLevel::Info)
        });
        let context = logger.start_operation(OperationKind::Single, "https://api.example.com/v1/Orders");
        assert!(context.correlation_id.is_empty());
    }

    #[test]
    fn test_url_redaction() {
        let redacted = redact_url("https://api.example.com/v1/Products?access_token=abc&$skip=100");
        assert!(redacted.contains("access_token=%5BREDACTED%5D"));
        assert!(redacted.contains("skip=100"));
        assert!(!redacted.contains("abc"));

        assert_eq!(redact_url("not a url"), "not a url");
        assert_eq!(
            redact_url("https://api.example.com/v1/Products"),
            "https://api.example.com/v1/Products"
        );
    }

    #[test]
    fn test_log_level_filtering() {
        let logger = ApiLogger::new(config(LogLevel::Warn));

        assert!(logger.should_log(&LogLevel::Error));
        assert!(logger.should_log(&LogLevel::Warn));
        assert!(!logger.should_log(&LogLevel::Info));
        assert!(!logger.should_log(&LogLevel::Debug));
        assert!(!logger.should_log(&LogLevel::Trace));
    }
}
