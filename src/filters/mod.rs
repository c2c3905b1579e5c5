//! Signal conditioning for raw control-board readings.
//!
//! Both filters are plain values with no clock of their own: callers
//! push samples (and, for the latch, the current monotonic time) once
//! per tick.

pub mod moving_average;
pub mod timed_latch;

pub use moving_average::MovingAverage;
pub use timed_latch::TimedLatch;
