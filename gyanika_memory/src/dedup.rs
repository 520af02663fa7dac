//! Duplicate-utterance suppression.
//!
//! The upstream speech pipeline is known to deliver the same final
//! transcript more than once in quick succession. The guard discards a
//! candidate utterance when it is identical to the previously accepted one
//! and arrives inside a short debounce window.

use chrono::{DateTime, Duration, Utc};
use gyanika_core::content_hash;

/// Tracks the last accepted user utterance and its arrival time.
#[derive(Debug)]
pub struct DuplicateGuard {
    window: Duration,
    last_hash: Option<String>,
    last_at: Option<DateTime<Utc>>,
}

impl DuplicateGuard {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_hash: None,
            last_at: None,
        }
    }

    /// Check a candidate utterance, recording it if accepted.
    ///
    /// Returns `true` when the utterance is a duplicate that should be
    /// discarded. The timestamp of the last *accepted* utterance is kept as
    /// the reference point, so a burst of identical deliveries is compared
    /// against the first one.
    pub fn is_duplicate(&mut self, text: &str, now: DateTime<Utc>) -> bool {
        let hash = content_hash("user", text);

        if let (Some(last_hash), Some(last_at)) = (&self.last_hash, self.last_at) {
            if *last_hash == hash && now - last_at < self.window {
                return true;
            }
        }

        self.last_hash = Some(hash);
        self.last_at = Some(now);
        false
    }
}
