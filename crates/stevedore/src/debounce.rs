//! Debounce gate for user-triggered actions.
//!
//! The host can deliver the same action twice within milliseconds (a
//! double-click proxy). The gate turns the second invocation inside the
//! window into a single alternate effect instead of repeating the real
//! action. Whether to suppress is decided synchronously at call time, so
//! back-to-back dispatch of two invocations cannot both pick the real
//! path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub struct DebounceGate {
    window: Duration,
    last_invocation: Mutex<HashMap<String, Instant>>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        DebounceGate {
            window,
            last_invocation: Mutex::new(HashMap::new()),
        }
    }

    /// Run `real` unless `key` was invoked within the window, in which
    /// case run `fallback` instead. Suppression consumes the recorded
    /// timestamp: one rapid double-invocation yields exactly one fallback,
    /// and a third rapid call starts over with the real action.
    ///
    /// No ordering is guaranteed between the fallback and a still-running
    /// real action from the prior invocation.
    pub fn invoke<T, R, F>(&self, key: &str, real: R, fallback: F) -> impl Future<Output = T>
    where
        R: Future<Output = T>,
        F: Future<Output = T>,
    {
        let suppress = self.should_suppress(key, Instant::now());
        async move {
            if suppress {
                fallback.await
            } else {
                real.await
            }
        }
    }

    fn should_suppress(&self, key: &str, now: Instant) -> bool {
        let mut last = self
            .last_invocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match last.get(key) {
            Some(&at) if now.saturating_duration_since(at) < self.window => {
                last.remove(key);
                true
            }
            _ => {
                last.insert(key.to_string(), now);
                false
            }
        }
    }
}
