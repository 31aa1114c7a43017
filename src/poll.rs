//! Waiting for a user to join a room.
//!
//! Each attempt issues exactly one joined-members query. Between attempts the
//! poll sleeps for the configured interval; it stops when the user shows up,
//! when a query fails, when the attempt or time budget runs out, or when the
//! cancellation token fires.

use crate::client::MatrixClient;
use crate::error::PollError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default delay between membership queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bounds for a join poll. With neither bound set the poll runs until the
/// user joins, a query fails, or it is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive queries. Zero queries back to back.
    pub interval: Duration,
    /// Give up after this many queries.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first query.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

impl PollConfig {
    /// Back-to-back queries with no bound.
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Poll `room_id` until `user_id` is among its joined members.
///
/// Returns the number of queries issued, including the successful one.
pub async fn wait_for_join(
    client: &dyn MatrixClient,
    room_id: &str,
    user_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<u32, PollError> {
    let started = Instant::now();
    // A timeout too large to represent is no deadline at all.
    let deadline = config.timeout.and_then(|t| started.checked_add(t));
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(room_id, user_id, attempts));
        }
        if let Some(max) = config.max_attempts
            && attempts >= max
        {
            return Err(PollError::AttemptsExhausted {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                attempts,
            });
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            return Err(timed_out(room_id, user_id, attempts, started));
        }

        attempts += 1;
        let members = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled(room_id, user_id, attempts)),
            _ = sleep_until_opt(deadline) => {
                return Err(timed_out(room_id, user_id, attempts, started));
            }
            result = client.joined_members(room_id) => result?,
        };

        if members.contains(user_id) {
            debug!(room_id = %room_id, user_id = %user_id, attempts, "Target joined");
            return Ok(attempts);
        }
        debug!(room_id = %room_id, user_id = %user_id, attempts, "Target not joined yet");

        if !config.interval.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(room_id, user_id, attempts)),
                _ = sleep_until_opt(deadline) => {
                    return Err(timed_out(room_id, user_id, attempts, started));
                }
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn cancelled(room_id: &str, user_id: &str, attempts: u32) -> PollError {
    PollError::Cancelled {
        user_id: user_id.to_string(),
        room_id: room_id.to_string(),
        attempts,
    }
}

fn timed_out(room_id: &str, user_id: &str, attempts: u32, started: Instant) -> PollError {
    PollError::TimedOut {
        user_id: user_id.to_string(),
        room_id: room_id.to_string(),
        attempts,
        waited_ms: started.elapsed().as_millis(),
    }
}
