//! Bulk export fallback: job polling, archive decoding and the cost heuristic

pub mod archive;
pub mod job;
pub mod strategy;

pub use archive::parse_export_archive;
pub use job::{ExportJob, ExportRequest, ExportStatus, poll_until_ready};
pub use strategy::{LookupStrategy, should_use_export};
