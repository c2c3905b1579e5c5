//! Boiler control algorithms.
//!
//! The controller only depends on the
//! [`BoilerController`](crate::app::ports::BoilerController) contract;
//! the implementations here are the defaults wired in by the firmware.

pub mod hysteresis;
pub mod pid;

pub use hysteresis::{HybridController, HysteresisController};
pub use pid::{PidController, PidRuntimeParameters, PidSettings};

/// Open-loop bonus duty during a brew: `max(0, k * elapsed_ms + m)`.
pub fn brew_feed_forward(elapsed_ms: u64, k: f32, m: f32) -> f32 {
    (k * elapsed_ms as f32 + m).max(0.0)
}
