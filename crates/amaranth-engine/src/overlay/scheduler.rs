//! Debounced reparse scheduling.
//!
//! The line-scan overlay path is cheap enough to run synchronously on every
//! keystroke; the tree-based path reparses and is not. This scheduler
//! coalesces edit bursts into one reparse per settled pause.
//!
//! Each scheduler is owned by one engine instance. Two open documents get
//! two schedulers and can never corrupt each other's timers or last-parsed
//! state. There is no timer thread: the host's single-threaded event loop
//! calls [`DebounceScheduler::poll`] each turn, keeping the whole engine
//! cooperative with at most one pending reparse at a time.

use std::time::{Duration, Instant};

/// Default quiet window before a pending reparse fires.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct DebounceScheduler {
    quiet_window: Duration,
    /// Deadline of the single pending reparse, if any. Rescheduling moves
    /// it; it never stacks.
    deadline: Option<Instant>,
    /// Text of the last fired reparse, compared to skip content-identical
    /// work (selection-only churn must not trigger reparses).
    last_parsed: Option<String>,
}

impl DebounceScheduler {
    #[must_use]
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            deadline: None,
            last_parsed: None,
        }
    }

    /// Request a reparse. Cancels and reschedules any pending one, so a
    /// burst of calls inside the quiet window collapses to a single fire.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet_window);
    }

    /// True if a reparse is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Check whether the pending reparse should fire.
    ///
    /// Returns true exactly when the quiet window has elapsed and `text`
    /// differs from the last fired content; firing consumes the deadline
    /// and records the text. Content-identical fires are no-ops (the
    /// deadline is still consumed).
    pub fn poll(&mut self, now: Instant, text: &str) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.last_parsed.as_deref() == Some(text) {
                    return false;
                }
                self.last_parsed = Some(text.to_string());
                true
            }
            _ => false,
        }
    }

    /// Drop any pending work. Called on teardown so a disposed surface is
    /// never acted upon.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}
