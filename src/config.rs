//! Controller configuration parameters
//!
//! Every tuning constant of the control core lives here and is injected at
//! construction.  Temperatures are in the control board's scaled units.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of 100 ms slots in one power-sharing super-cycle.
pub const SUPER_CYCLE_SLOTS: usize = 25;

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Fixed control tick period (milliseconds)
    pub tick_period_ms: u32,
    /// Continuous clean communication required to leave a soft bail (µs)
    pub recovery_window_us: u64,

    // --- Heatup ---
    /// Brew temperature at or above which startup skips heatup
    pub heatup_skip_temp: f32,
    /// Brew temperature above which heatup moves to stage 2
    pub heatup_stage2_temp: f32,
    /// Time spent in heatup stage 2 before normal operation (seconds)
    pub heatup_stage2_secs: u32,
    /// Brew setpoint forced during both heatup stages
    pub heatup_brew_set_point: f32,
    /// Setpoint for both boilers while sleeping
    pub sleep_set_point: f32,

    // --- At-setpoint predicate ---
    /// Brew boiler counts as warm within ± this band
    pub brew_tolerance: f32,
    /// Service boiler counts as warm within ± this band (ignored in eco mode)
    pub service_tolerance: f32,

    // --- Interlocks ---
    /// Water-tank-empty flag must persist this long to latch (ms)
    pub water_tank_latch_ms: u32,
    /// Service-boiler-low flag must persist this long to latch (ms)
    pub service_low_latch_ms: u32,

    // --- Power sharing ---
    /// Feed-forward slope per millisecond since brew start
    pub feed_forward_k: f32,
    /// Feed-forward intercept at brew start
    pub feed_forward_m: f32,
    /// Fraction of its request the brew boiler keeps on overflow when idle
    pub idle_brew_share: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_period_ms: 100,
            recovery_window_us: 2_000_000,

            // Heatup
            heatup_skip_temp: 65.0,
            heatup_stage2_temp: 128.0,
            heatup_stage2_secs: 4 * 60,
            heatup_brew_set_point: 130.0,
            sleep_set_point: 70.0,

            // At-setpoint
            brew_tolerance: 2.0,
            service_tolerance: 4.0,

            // Interlocks
            water_tank_latch_ms: 1000,
            service_low_latch_ms: 500,

            // Power sharing: start at +5 and reach zero 20 s into the brew
            feed_forward_k: -0.00025,
            feed_forward_m: 5.0,
            idle_brew_share: 0.75,
        }
    }
}

impl ControllerConfig {
    /// Tick period in microseconds.
    pub fn tick_period_us(&self) -> u64 {
        u64::from(self.tick_period_ms) * 1000
    }

    /// Heatup stage-2 duration in microseconds.
    pub fn heatup_stage2_us(&self) -> u64 {
        u64::from(self.heatup_stage2_secs) * 1_000_000
    }

    /// Reject values the control core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_period_ms must be > 0"));
        }
        if self.recovery_window_us == 0 {
            return Err(ConfigError::ValidationFailed(
                "recovery_window_us must be > 0",
            ));
        }
        if self.heatup_skip_temp >= self.heatup_stage2_temp {
            return Err(ConfigError::ValidationFailed(
                "heatup_skip_temp must be < heatup_stage2_temp",
            ));
        }
        if self.water_tank_latch_ms == 0 || self.service_low_latch_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "latch hold durations must be > 0",
            ));
        }
        if !(self.idle_brew_share > 0.0 && self.idle_brew_share <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "idle_brew_share must be in (0, 1]",
            ));
        }
        if self.brew_tolerance < 0.0 || self.service_tolerance < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "setpoint tolerances must be >= 0",
            ));
        }
        Ok(())
    }
}
