//! Bulk export job model and status polling

use crate::api::error::{ApiError, ApiResult};
use crate::api::resilience::sleep_or_cancel;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Body posted to `<Resource>Export`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportRequest {
    /// CSV header, one column per field
    pub fields: Vec<String>,
    pub delimiter: String,
}

impl ExportRequest {
    pub fn tab_delimited(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            delimiter: "\t".to_string(),
        }
    }
}

/// Export job as reported by the export endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportJob {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub response_file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    InProgress,
    Pending,
    Complete,
    /// Anything outside the known set
    Failed(String),
}

impl ExportStatus {
    pub fn parse(status: &str) -> Self {
        let normalized: String = status
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "inprogress" => ExportStatus::InProgress,
            "pending" => ExportStatus::Pending,
            "complete" | "completed" => ExportStatus::Complete,
            _ => ExportStatus::Failed(status.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExportStatus::Failed(_))
    }
}

impl ExportJob {
    /// Download URL once the file is ready
    pub fn file_url(&self) -> Option<&str> {
        self.response_file_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    /// A missing status counts as failed
    pub fn status(&self) -> ExportStatus {
        match self.status.as_deref() {
            Some(status) => ExportStatus::parse(status),
            None => ExportStatus::Failed("<missing>".to_string()),
        }
    }

    /// Error out when the job can no longer produce a file
    pub fn ensure_progressing(&self) -> ApiResult<()> {
        if self.file_url().is_some() {
            return Ok(());
        }
        match self.status() {
            ExportStatus::Failed(status) => Err(ApiError::ExportUnavailable(format!(
                "export job reported status '{}'",
                status
            ))),
            _ => Ok(()),
        }
    }
}

/// Poll every `interval` until the job exposes its file URL
///
/// Sleeps before each poll; gives up with `ExportUnavailable` after
/// `max_polls` polls or as soon as the job reports an unknown status.
pub async fn poll_until_ready<F, Fut>(
    interval: Duration,
    max_polls: u32,
    cancel: &CancellationToken,
    mut poll: F,
) -> ApiResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<ExportJob>>,
{
    let max_polls = max_polls.max(1);
    for attempt in 1..=max_polls {
        sleep_or_cancel(interval, cancel).await?;

        let job = poll().await?;
        job.ensure_progressing()?;

        if let Some(url) = job.file_url() {
            info!("Export file ready after {} polls", attempt);
            return Ok(url.to_string());
        }
        debug!(
            "Export job still {:?} (poll {}/{})",
            job.status(),
            attempt,
            max_polls
        );
    }

    Err(ApiError::ExportUnavailable(format!(
        "export file not ready after {} polls",
        max_polls
    )))
}
