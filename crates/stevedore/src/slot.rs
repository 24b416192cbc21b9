//! Check slots: at-most-one-in-flight periodic work.
//!
//! A slot owns the task handle of its last run plus an "earliest next
//! eligible" timestamp. The cool-down between runs is enforced by the
//! completing task recording that timestamp, not by a sleep inside the
//! task body, so eligibility is a pure function of (handle finished,
//! now) and can be tested with synthetic instants.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

pub struct CheckSlot {
    name: &'static str,
    cooldown: Duration,
    /// Reference point for the eligibility clock.
    base: Instant,
    /// Milliseconds after `base` at which the slot becomes eligible again.
    next_eligible_ms: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl CheckSlot {
    /// A fresh slot is first eligible `initial_delay` after construction,
    /// then `cooldown` after each run completes.
    pub fn new(name: &'static str, initial_delay: Duration, cooldown: Duration) -> Self {
        CheckSlot {
            name,
            cooldown,
            base: Instant::now(),
            next_eligible_ms: Arc::new(AtomicU64::new(initial_delay.as_millis() as u64)),
            task: None,
        }
    }

    /// True when the previous run has finished and the cool-down elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        let finished = self.task.as_ref().map_or(true, JoinHandle::is_finished);
        if !finished {
            return false;
        }
        let eligible_at = Duration::from_millis(self.next_eligible_ms.load(Ordering::Acquire));
        now.saturating_duration_since(self.base) >= eligible_at
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Record a new in-flight run. The caller must have checked `is_due`;
    /// the wrapped task stamps the next eligibility time when it finishes,
    /// successful or not.
    pub fn start<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("Starting {} check", self.name);
        let base = self.base;
        let cooldown = self.cooldown;
        let next_eligible_ms = Arc::clone(&self.next_eligible_ms);
        self.task = Some(tokio::spawn(async move {
            fut.await;
            let done = Instant::now().saturating_duration_since(base) + cooldown;
            next_eligible_ms.store(done.as_millis() as u64, Ordering::Release);
        }));
    }

    /// Cancel the in-flight run, discarding its partial work.
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Aborting {} check", self.name);
            }
            task.abort();
        }
    }
}
