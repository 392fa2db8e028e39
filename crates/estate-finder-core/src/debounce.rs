// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Debounce scheduler
//
// One Debouncer per input field. Each schedule() call replaces the pending
// timer, so only the last input of a burst reaches the callback.

use std::time::Duration;
use tokio::task::JoinHandle;

/// Delays a callback until input has been quiet for `delay`
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Restart the timer with `input`; `on_settle` runs once if nothing
    /// else is scheduled before the delay elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, input: String, on_settle: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.cancel();

        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_settle(input);
        }));
    }

    /// Drop the pending timer, if any, without firing it
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a timer is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
