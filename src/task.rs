//! The queued-waiter record, `AcquireTask`.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::{connection::Connection, error::Result};

/// One queued waiter in a [`crate::pool::Pool`]'s `pending_queue`.
///
/// The acquired-flag is monotonic: once set it never clears, and setting it
/// is always paired with an atomic increment of `acquired_count` at the same
/// call site. Both are enforced by construction here — the flag is only
/// ever flipped by [`AcquireTask::mark_acquired`], called exactly once per
/// task on the dispatcher.
pub(crate) struct AcquireTask {
    pub(crate) id: u64,
    sink: oneshot::Sender<Result<Connection>>,
    acquired: bool,
    enqueued_at: Instant,
    deadline: Option<Instant>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl AcquireTask {
    pub(crate) fn new(
        id: u64,
        sink: oneshot::Sender<Result<Connection>>,
        acquire_timeout: Option<Duration>,
    ) -> Self {
        let enqueued_at = Instant::now();
        AcquireTask {
            id,
            sink,
            acquired: false,
            enqueued_at,
            deadline: acquire_timeout.map(|timeout| enqueued_at + timeout),
            timer: None,
        }
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn waited(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    pub(crate) fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Raises the acquired-flag. Idempotent from the caller's perspective:
    /// it is a bug (and will panic in debug builds) to call this twice on
    /// the same task, since that would mean `acquired_count` was
    /// incremented for it more than once.
    pub(crate) fn mark_acquired(&mut self) {
        debug_assert!(!self.acquired, "acquired-flag set twice for the same task");
        self.acquired = true;
    }

    pub(crate) fn set_timer(&mut self, timer: tokio::task::JoinHandle<()>) {
        self.timer = Some(timer);
    }

    /// Cancels the scheduled timer, if any. Called whenever the task leaves
    /// the queue, whether by dispatch, timeout, or cancellation.
    pub(crate) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Delivers the final outcome to the caller's completion sink.
    ///
    /// The caller is allowed to have dropped its receiving end (it abandoned
    /// the acquire); the pool does not treat that as an error, and has
    /// already decided what to do with the connection (if any) before
    /// calling this.
    pub(crate) fn complete(mut self, result: Result<Connection>) {
        self.cancel_timer();
        let _ = self.sink.send(result);
    }
}
