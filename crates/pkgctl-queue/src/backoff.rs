//! Retry schedule construction.
//!
//! A [`Task`](crate::Task)'s retry spacing is any
//! `backoff::backoff::Backoff` implementation; `next_backoff` returning
//! `None` is the *Stop* sentinel that abandons the task. We use the
//! `backoff` crate directly rather than a bespoke schedule type, matching
//! the defaults this spec calls out: ~500 ms initial interval, 1.5x
//! multiplier, ~60 s max interval, ~15 min elapsed cap.

use std::time::Duration;

use backoff::ExponentialBackoff;

/// Build the default exponential backoff schedule.
///
/// These values are `backoff::ExponentialBackoff`'s own defaults; they are
/// spelled out explicitly here so the policy is visible at the call site
/// rather than implied by an upstream crate default.
#[must_use]
pub fn default_schedule() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        multiplier: 1.5,
        max_interval: Duration::from_secs(60),
        max_elapsed_time: Some(Duration::from_secs(15 * 60)),
        ..ExponentialBackoff::default()
    }
}
