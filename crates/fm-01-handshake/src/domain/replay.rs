//! # Replay Window
//!
//! Remembers accepted handshake signatures for a while so the same signed
//! message cannot be accepted twice in quick succession. The whole set is
//! dropped when the window expires or when it reaches its entry cap, so this
//! is not a complete anti-replay guarantee.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use shared_crypto::{keccak256, RecoverableSignature};
use shared_types::Hash;
use tracing::debug;

/// Default entry cap for one window.
pub const DEFAULT_REPLAY_CAPACITY: usize = 65_536;

#[derive(Debug)]
struct WindowState {
    seen: HashSet<Hash>,
    started: Instant,
}

/// Time-bucketed set of accepted signatures.
#[derive(Debug)]
pub struct ReplayWindow {
    state: Mutex<WindowState>,
    window: Duration,
    max_entries: usize,
}

impl ReplayWindow {
    /// Create a window with the default entry cap. A zero duration accepts
    /// everything.
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(window, DEFAULT_REPLAY_CAPACITY)
    }

    /// Create a window that rotates early once `max_entries` signatures are
    /// tracked. A cap of zero is treated as one.
    pub fn with_capacity(window: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(WindowState {
                seen: HashSet::new(),
                started: Instant::now(),
            }),
            window,
            max_entries: max_entries.max(1),
        }
    }

    /// Record `signature`, returning `false` if it was already seen in the
    /// current window.
    ///
    /// Only `r || s` is keyed, so the 0/1 and 27/28 spellings of one
    /// signature count as the same.
    pub fn check_and_insert(&self, signature: &RecoverableSignature) -> bool {
        if self.window.is_zero() {
            return true;
        }
        let key = keccak256(&signature.as_bytes()[..64]);

        let mut state = self.state.lock();
        if state.started.elapsed() > self.window {
            state.seen.clear();
            state.started = Instant::now();
        } else if state.seen.len() >= self.max_entries && !state.seen.contains(&key) {
            debug!(entries = state.seen.len(), "Replay window full, rotating early");
            state.seen.clear();
            state.started = Instant::now();
        }
        state.seen.insert(key)
    }

    /// Signatures tracked in the current window.
    pub fn len(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// True if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.state.lock().seen.is_empty()
    }
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
