// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Fixed-interval polling with optional bounds.
//!
//! # Overview
//!
//! CVAT processes uploaded data and annotation imports in the background, so
//! the client has to ask again until the server reports the expected state.
//! [`PollPolicy`] describes how often to ask and when to give up:
//!
//! - **interval**: delay between two polls (default 1 second)
//! - **max_attempts**: give up after this many polls (default unbounded)
//! - **timeout**: give up once this much time has elapsed (default unbounded).
//!   The wait before the last check is shortened so that check lands on the
//!   deadline, so a timeout shorter than the interval still gets a second
//!   check.
//!
//! The default policy never gives up, matching a server that is expected to
//! eventually confirm every upload. Bounded policies turn a stalled server
//! into [`Error::PollTimeout`].
//!
//! # Examples
//!
//! ```rust
//! use cvat_ingest::PollPolicy;
//! use std::time::Duration;
//!
//! let policy = PollPolicy::default()
//!     .with_interval(Duration::from_millis(250))
//!     .with_max_attempts(40);
//! assert_eq!(policy.max_attempts(), Some(40));
//! ```

use crate::Error;
use log::trace;
use std::{
    future::Future,
    time::{Duration, Instant},
};

/// How a condition is re-checked until it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(self, interval: Duration) -> Self {
        PollPolicy { interval, ..self }
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        PollPolicy {
            max_attempts: Some(max_attempts),
            ..self
        }
    }

    /// Stop polling once `timeout` has elapsed since the first check. The
    /// condition is checked one last time at the deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        PollPolicy {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// True when neither an attempt nor a time bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.timeout.is_none()
    }
}

/// Result of a successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    pub value: T,
    /// Number of times the condition was checked, including the last one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Call `check` until it yields `Some`, sleeping `policy.interval` between
/// calls.
///
/// Errors returned by `check` end the poll immediately. When a bound in the
/// policy is reached first, returns [`Error::PollTimeout`]. A sleep never runs
/// past the timeout: the final wait is cut to the time remaining.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, mut check: F) -> Result<Polled<T>, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, Error>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            return Ok(Polled {
                value,
                attempts,
                elapsed: start.elapsed(),
            });
        }

        let elapsed = start.elapsed();
        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(Error::PollTimeout { attempts, elapsed });
        }

        let wait = match policy.timeout {
            Some(timeout) if elapsed >= timeout => {
                return Err(Error::PollTimeout { attempts, elapsed });
            }
            Some(timeout) => policy.interval.min(timeout - elapsed),
            None => policy.interval,
        };

        trace!("Poll attempt {} not ready, waiting {:?}", attempts, wait);
        tokio::time::sleep(wait).await;
    }
}
