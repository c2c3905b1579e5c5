//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`** — `esp_timer_get_time()`, the ESP-IDF
//!   high-resolution timer (µs since boot).
//! - **`not(target_os = "espidf")`** — `std::time::Instant` for host
//!   simulation.
//!
//! Both sleep with `std::thread::sleep`, which yields to FreeRTOS on
//! the device.

use std::time::Duration;

use crate::app::ports::Clock;

/// Microsecond clock since construction (host) or boot (device).
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Time left until `deadline_us`, zero if already past.
    pub fn remaining(&self, deadline_us: u64) -> Duration {
        Duration::from_micros(deadline_us.saturating_sub(self.now_us()))
    }
}

impl Clock for MonotonicClock {
    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> u64 {
        // SAFETY: reads a free-running hardware counter; no shared state.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn sleep_until(&mut self, deadline_us: u64) {
        let left = self.remaining(deadline_us);
        if !left.is_zero() {
            std::thread::sleep(left);
        }
    }
}
