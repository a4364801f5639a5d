//! Presence timer — single-slot restartable deadline for typing expiry.
//!
//! DESIGN
//! ======
//! One pending deadline at most. `start` overwrites any prior deadline, so a
//! burst of inbound typing signals collapses into a single expiry — no
//! timer-id bookkeeping, nothing to leak. The session's event loop awaits
//! [`PresenceTimer::fired`]; when no deadline is armed the future simply
//! never resolves, which is exactly what a `select!` arm wants.

use std::time::Duration;

use tokio::time::Instant;

/// How long a remote "typing" indication stays live without a refresh.
pub const TYPING_EXPIRY: Duration = Duration::from_millis(3000);

/// A single pending deadline, restartable and cancelable.
#[derive(Clone, Copy, Debug, Default)]
pub struct PresenceTimer {
    deadline: Option<Instant>,
}

impl PresenceTimer {
    #[must_use]
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer `duration` from now, superseding any pending deadline.
    pub fn start(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    /// Drop the pending deadline, if any. Idempotent.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve when the armed deadline elapses; never resolve when unarmed.
    ///
    /// The caller clears the slot (via [`cancel`](Self::cancel) or a fresh
    /// [`start`](Self::start)) after handling the expiry — the timer itself
    /// holds no callback state.
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
