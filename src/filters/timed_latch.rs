//! Debounced boolean.
//!
//! The confirmed value only follows the raw input after the raw input
//! has disagreed with it continuously for the configured hold time.
//!
//! ```text
//!  raw       ‾‾‾‾‾‾|____|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//!  pending         ·    ·<─── hold ───>
//!  confirmed ______________________________|‾‾‾‾‾
//! ```

/// Boolean that changes only after its new value persists.
#[derive(Debug, Clone)]
pub struct TimedLatch {
    hold_us: u64,
    value: bool,
    /// Instant the raw input first disagreed with `value`.
    pending_since: Option<u64>,
}

impl TimedLatch {
    pub fn new(hold_ms: u32, initial: bool) -> Self {
        Self {
            hold_us: u64::from(hold_ms) * 1000,
            value: initial,
            pending_since: None,
        }
    }

    /// Feed one raw reading taken at `now_us`.
    pub fn set(&mut self, raw: bool, now_us: u64) {
        if raw == self.value {
            self.pending_since = None;
            return;
        }

        match self.pending_since {
            None => self.pending_since = Some(now_us),
            Some(since) if now_us.saturating_sub(since) >= self.hold_us => {
                self.value = raw;
                self.pending_since = None;
            }
            Some(_) => {}
        }
    }

    /// Confirmed value.
    pub fn get(&self) -> bool {
        self.value
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }
}
