//! Per-operation-kind request timeouts

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Kind of outgoing call, used to pick a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Token endpoint round trip
    Token,
    /// Single-entity request
    Single,
    /// One page of a collection
    Page,
    /// `$batch` request
    Batch,
    /// Starting a bulk export job
    ExportRequest,
    /// Polling a bulk export job
    ExportPoll,
    /// Downloading an export archive
    Download,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Token => "token",
            OperationKind::Single => "single",
            OperationKind::Page => "page",
            OperationKind::Batch => "batch",
            OperationKind::ExportRequest => "export_request",
            OperationKind::ExportPoll => "export_poll",
            OperationKind::Download => "download",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeout overrides keyed by operation kind, with a default fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutRegistry {
    default: Duration,
    overrides: HashMap<OperationKind, Duration>,
}

impl Default for TimeoutRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
            .with_override(OperationKind::Token, Duration::from_secs(30))
            .with_override(OperationKind::Batch, Duration::from_secs(180))
            .with_override(OperationKind::Download, Duration::from_secs(600))
    }
}

impl TimeoutRegistry {
    /// Registry with no overrides
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, kind: OperationKind, timeout: Duration) -> Self {
        self.overrides.insert(kind, timeout);
        self
    }

    pub fn set(&mut self, kind: OperationKind, timeout: Duration) {
        self.overrides.insert(kind, timeout);
    }

    pub fn set_default(&mut self, timeout: Duration) {
        self.default = timeout;
    }

    /// Timeout for `kind`, falling back to the default
    pub fn get(&self, kind: OperationKind) -> Duration {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_and_fallback() {
        let registry = TimeoutRegistry::new(Duration::from_secs(10))
            .with_override(OperationKind::Batch, Duration::from_secs(90));

        assert_eq!(registry.get(OperationKind::Batch), Duration::from_secs(90));
        assert_eq!(registry.get(OperationKind::Page), Duration::from_secs(10));
        assert_eq!(registry.get(OperationKind::Token), Duration::from_secs(10));
    }

    #[test]
    fn test_set_replaces_override() {
        let mut registry = TimeoutRegistry::default();
        registry.set(OperationKind::Token, Duration::from_secs(5));
        registry.set_default(Duration::from_secs(15));

        assert_eq!(registry.get(OperationKind::Token), Duration::from_secs(5));
        assert_eq!(registry.get(OperationKind::Single), Duration::from_secs(15));
        assert_eq!(registry.get(OperationKind::Download), Duration::from_secs(600));
    }
}
