//! Configuration surface for a [`crate::pool::Pool`].

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::error::{PoolError, Result};

/// Order in which the idle reservoir hands connections back out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum SelectionOrder {
    /// Most recently released connection first — the warmest socket.
    #[default]
    Lifo,
    /// Oldest released connection first — ages out stale peers.
    Fifo,
}

/// What happens to a waiter whose acquire-timeout elapses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum TimeoutMode {
    /// No timers are scheduled; waiters queue indefinitely.
    #[default]
    None,
    /// On expiry the waiter is failed with [`PoolError::AcquireTimeout`].
    Fail,
    /// On expiry the waiter is promoted into a new connection attempt,
    /// bypassing the capacity check. This intentionally lets
    /// `acquired_count` exceed `capacity` under sustained contention,
    /// trading bound-preservation for liveness.
    New,
}

/// Construction-time options for a [`crate::pool::Pool`].
///
/// `acquire_timeout` and `timeout_mode` must be specified together: setting
/// one without the other is rejected by [`PoolOptions::validate`] with
/// [`PoolError::InvalidConfig`].
#[derive(Clone, Debug, TypedBuilder)]
pub struct PoolOptions {
    /// Maximum number of connections that may be concurrently `acquired`.
    pub capacity: u32,

    /// Maximum number of waiters that may be queued at once.
    #[builder(default = 64)]
    pub max_pending: u32,

    /// How long a queued waiter may wait before its timeout mode applies.
    #[builder(default)]
    pub acquire_timeout: Option<Duration>,

    /// What happens to a waiter when `acquire_timeout` elapses.
    #[builder(default)]
    pub timeout_mode: TimeoutMode,

    /// Whether `release` runs the health check before returning a connection
    /// to the idle reservoir.
    #[builder(default = true)]
    pub release_health_check: bool,

    /// Order in which the idle reservoir hands connections back out.
    #[builder(default)]
    pub selection_order: SelectionOrder,
}

impl PoolOptions {
    /// Validates the combination of options, matching the constructor rules
    /// from the pool's specification.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig {
                message: "capacity must be strictly positive".into(),
            });
        }
        if self.max_pending == 0 {
            return Err(PoolError::InvalidConfig {
                message: "max_pending must be strictly positive".into(),
            });
        }
        match (self.timeout_mode, self.acquire_timeout) {
            (TimeoutMode::None, None) => {}
            (TimeoutMode::None, Some(_)) => {
                return Err(PoolError::InvalidConfig {
                    message: "acquire_timeout was set without a timeout_mode".into(),
                });
            }
            (_, None) => {
                return Err(PoolError::InvalidConfig {
                    message: "timeout_mode was set without an acquire_timeout".into(),
                });
            }
            (_, Some(_)) => {}
        }
        Ok(())
    }
}
