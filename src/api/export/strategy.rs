//! Export-versus-lookup heuristic

use crate::api::resilience::ExportConfig;

/// How a set of keys is resolved to identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// One bulk export job
    Export,
    /// Batched `$filter` lookups
    Batched,
}

/// Seconds spent resolving `key_count` keys through batched lookups
pub fn estimated_lookup_secs(key_count: usize, max_batch_size: usize, avg_request_secs: f64) -> f64 {
    key_count.div_ceil(max_batch_size.max(1)) as f64 * avg_request_secs
}

/// Export only when batched lookups are expected to outlast an export job
pub fn should_use_export(key_count: usize, max_batch_size: usize, config: &ExportConfig) -> bool {
    estimated_lookup_secs(key_count, max_batch_size, config.avg_request_secs) > config.avg_export_secs
}

pub fn choose(key_count: usize, max_batch_size: usize, config: &ExportConfig) -> LookupStrategy {
    if should_use_export(key_count, max_batch_size, config) {
        LookupStrategy::Export
    } else {
        LookupStrategy::Batched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ExportConfig {
        ExportConfig {
            avg_request_secs: 5.0,
            avg_export_secs: 600.0,
            ..ExportConfig::default()
        }
    }

    #[test]
    fn test_large_key_sets_use_export() {
        assert_eq!(estimated_lookup_secs(13_000, 100, 5.0), 650.0);
        assert!(should_use_export(13_000, 100, &config()));
        assert_eq!(choose(13_000, 100, &config()), LookupStrategy::Export);
    }

    #[test]
    fn test_small_key_sets_use_lookups() {
        assert_eq!(estimated_lookup_secs(1_000, 100, 5.0), 50.0);
        assert!(!should_use_export(1_000, 100, &config()));
        // 120 batches * 5s is exactly the export time, not above it
        assert!(!should_use_export(12_000, 100, &config()));
        assert_eq!(choose(0, 100, &config()), LookupStrategy::Batched);
    }
}
