//! Concurrency and rolling-window rate limiter
//!
//! A request is admitted once it holds one of `max_concurrent` slots and fewer
//! than `permits_per_window` requests were admitted during the last `window`.
//! The slot is released when the admitted future completes or is dropped.
//! Slots are handed out in FIFO order, so admission never reorders callers.

use super::config::RateLimitConfig;
use super::retry::sleep_or_cancel;
use crate::api::error::{ApiError, ApiResult};
use log::debug;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Rate limiter shared by every clone of a client
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    slots: Arc<Semaphore>,
    window: Arc<Mutex<WindowState>>,
    config: RateLimitConfig,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct WindowState {
    admissions: VecDeque<Instant>,
    requests_made: u64,
    requests_delayed: u64,
}

/// Proof of admission; dropping it frees the concurrency slot
#[derive(Debug)]
pub struct RateLimitPermit {
    _slot: OwnedSemaphorePermit,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        let slots = if config.enabled {
            config.max_concurrent.max(1)
        } else {
            Semaphore::MAX_PERMITS
        };

        Self {
            name,
            slots: Arc::new(Semaphore::new(slots)),
            window: Arc::new(Mutex::new(WindowState::default())),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort waits when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run `operation` once admitted, holding the slot until it completes
    pub async fn execute<F, Fut, T>(&self, operation: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let _permit = self.acquire().await?;
        operation().await
    }

    /// Wait for a concurrency slot and a window permit
    pub async fn acquire(&self) -> ApiResult<RateLimitPermit> {
        let slot = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            slot = self.slots.clone().acquire_owned() => {
                slot.map_err(|_| ApiError::Cancelled)?
            }
        };

        if !self.config.enabled {
            return Ok(RateLimitPermit { _slot: slot });
        }

        let mut delayed = false;
        loop {
            let wait = {
                let mut window = self.lock_window();
                let wait = self.try_admit(&mut window, Instant::now());
                if wait.is_some() && !delayed {
                    window.requests_delayed += 1;
                }
                wait
            };

            match wait {
                None => return Ok(RateLimitPermit { _slot: slot }),
                Some(wait) => {
                    delayed = true;
                    debug!("Rate limiter [{}]: waiting {:?} for window permit", self.name, wait);
                    sleep_or_cancel(wait, &self.cancel).await?;
                }
            }
        }
    }

    /// Admit without waiting; `None` when a slot or window permit is unavailable
    pub fn try_acquire(&self) -> Option<RateLimitPermit> {
        let slot = self.slots.clone().try_acquire_owned().ok()?;
        if !self.config.enabled {
            return Some(RateLimitPermit { _slot: slot });
        }

        let mut window = self.lock_window();
        match self.try_admit(&mut window, Instant::now()) {
            None => Some(RateLimitPermit { _slot: slot }),
            Some(_) => {
                window.requests_delayed += 1;
                None
            }
        }
    }

    /// Get current rate limiter statistics
    pub fn stats(&self) -> RateLimiterStats {
        let mut window = self.lock_window();
        Self::prune(&mut window, Instant::now(), self.config.window);
        RateLimiterStats {
            requests_made: window.requests_made,
            requests_delayed: window.requests_delayed,
            admitted_in_window: window.admissions.len(),
            available_slots: self.slots.available_permits(),
            enabled: self.config.enabled,
            max_concurrent: self.config.max_concurrent,
            permits_per_window: self.config.permits_per_window,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record an admission at `now`, or return how long until the oldest one expires
    fn try_admit(&self, window: &mut WindowState, now: Instant) -> Option<Duration> {
        Self::prune(window, now, self.config.window);

        if window.admissions.len() < self.config.permits_per_window.max(1) as usize {
            window.admissions.push_back(now);
            window.requests_made += 1;
            return None;
        }

        let oldest = window.admissions.front().copied().unwrap_or(now);
        Some((oldest + self.config.window).saturating_duration_since(now).max(Duration::from_millis(1)))
    }

    fn prune(window: &mut WindowState, now: Instant, length: Duration) {
        while let Some(&oldest) = window.admissions.front() {
            if now.saturating_duration_since(oldest) >= length {
                window.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, WindowState> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    /// Total requests admitted
    pub requests_made: u64,
    /// Requests that had to wait for a window permit
    pub requests_delayed: u64,
    /// Admissions still counted against the current window
    pub admitted_in_window: usize,
    /// Free concurrency slots
    pub available_slots: usize,
    pub enabled: bool,
    pub max_concurrent: usize,
    pub permits_per_window: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(max_concurrent: usize, permits_per_window: u32) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrent,
            permits_per_window,
            window: Duration::from_secs(10),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(
            "test",
            RateLimitConfig {
                enabled: false,
                ..config(1, 1)
            },
        );

        let permits: Vec<_> = (0..100).filter_map(|_| limiter.try_acquire()).collect();
        assert_eq!(permits.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_permits_exhaust() {
        let limiter = RateLimiter::new("test", config(10, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire().is_some());
        }
        assert!(limiter.try_acquire().is_none());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(limiter.try_acquire().is_some());

        let stats = limiter.stats();
        assert_eq!(stats.requests_made, 4);
        assert_eq!(stats.requests_delayed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_slots_are_held_until_release() {
        let limiter = RateLimiter::new("test", config(2, 100));

        let first = limiter.try_acquire();
        let second = limiter.try_acquire();
        assert!(first.is_some() && second.is_some());
        assert!(limiter.try_acquire().is_none());

        drop(first);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_window() {
        let limiter = RateLimiter::new("test", config(1, 1));

        let start = Instant::now();
        limiter.execute(|| async { Ok(()) }).await.unwrap();
        limiter.execute(|| async { Ok(()) }).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_bounds_in_flight() {
        let limiter = RateLimiter::new("test", config(2, 1000));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    limiter
                        .execute(|| async {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.stats().available_slots, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_released_on_error() {
        let limiter = RateLimiter::new("test", config(1, 100));

        let result: ApiResult<()> = limiter
            .execute(|| async { Err(ApiError::Network("reset".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(limiter.stats().available_slots, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_releases_waiter() {
        let cancel = CancellationToken::new();
        let limiter = RateLimiter::new("test", config(1, 1)).with_cancellation(cancel.clone());

        let _held = limiter.acquire().await.unwrap();
        cancel.cancel();

        let result = limiter.acquire().await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }
}
