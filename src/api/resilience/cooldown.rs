//! Whole-hour quota cooldown
//!
//! Some tenants hit an hourly request quota rather than a short burst limit.
//! Backing off exponentially does not help there; the caller sleeps until the
//! top of the next hour plus a buffer instead.

use super::retry::sleep_or_cancel;
use crate::api::error::ApiResult;
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use log::warn;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Buffer added after the hour boundary by default
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(60);

/// Time remaining until the next hour boundary plus `buffer`
pub fn until_next_hour(now: DateTime<Utc>, buffer: Duration) -> Duration {
    let hour = ChronoDuration::hours(1);
    let current_hour = now.duration_trunc(hour).unwrap_or(now);
    let next_hour = current_hour + hour;
    let remaining = (next_hour - now).to_std().unwrap_or(Duration::ZERO);
    remaining + buffer
}

/// Sleep until the hourly quota resets
pub async fn wait_out_hourly_quota(buffer: Duration, cancel: &CancellationToken) -> ApiResult<()> {
    let wait = until_next_hour(Utc::now(), buffer);
    warn!("Hourly request quota exhausted, cooling down for {:?}", wait);
    sleep_or_cancel(wait, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mid_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 45, 0).unwrap();
        assert_eq!(
            until_next_hour(now, Duration::from_secs(30)),
            Duration::from_secs(15 * 60 + 30)
        );
    }

    #[test]
    fn test_exactly_on_the_hour_waits_a_full_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(until_next_hour(now, Duration::ZERO), Duration::from_secs(3600));
    }

    #[test]
    fn test_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 30).unwrap();
        assert_eq!(
            until_next_hour(now, DEFAULT_BUFFER),
            Duration::from_secs(30 + 60)
        );
    }
}
