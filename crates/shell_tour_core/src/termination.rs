use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::{Error, Result};

/// Cooperative stop condition: an optional deadline plus a shared cancel flag.
///
/// Clones and children share the flag, so cancelling any of them stops every
/// call chain derived from the same root.
#[derive(Clone, Debug)]
pub struct Termination {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Termination {
    pub fn never() -> Self {
        Self {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn after(budget: Duration) -> Self {
        Self::never().child(budget)
    }

    /// Root condition driven by an externally owned flag, e.g. an interrupt hook.
    pub fn with_flag(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            deadline: None,
            cancelled,
        }
    }

    /// Derives a condition that stops after `budget` or when `self` stops,
    /// whichever comes first.
    pub fn child(&self, budget: Duration) -> Self {
        let own = Instant::now().checked_add(budget);
        let deadline = match (self.deadline, own) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (Some(parent), None) => Some(parent),
            (None, own) => own,
        };
        Self {
            deadline,
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    pub fn check(&self) -> Result<()> {
        if self.should_stop() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// `budget` clipped to the remaining time.
    pub fn clip(&self, budget: Duration) -> Duration {
        self.remaining().map_or(budget, |left| left.min(budget))
    }
}
