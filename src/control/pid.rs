//! PID loop for the brew boiler.
//!
//! Runs once per super-cycle: gains are per invocation, not per second.
//! The integral term is clamped to the configured windup band and the
//! output to the duty range `0..=25`.

use serde::{Deserialize, Serialize};

use crate::config::SUPER_CYCLE_SLOTS;

/// User-tunable PID gains and integral limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidSettings {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub windup_low: f32,
    pub windup_high: f32,
}

impl Default for PidSettings {
    fn default() -> Self {
        Self {
            kp: 0.8,
            ki: 0.04,
            kd: 12.0,
            windup_low: -7.0,
            windup_high: 7.0,
        }
    }
}

impl PidSettings {
    /// All gains and both windup bounds are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.kp, self.ki, self.kd, self.windup_low, self.windup_high]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Read-back of the last computation, for status reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidRuntimeParameters {
    /// Last output came from bang-bang control instead of the PID terms.
    pub hysteresis_mode: bool,
    pub p: f32,
    pub i: f32,
    pub d: f32,
    pub integral: f32,
}

/// PID controller
pub struct PidController {
    settings: PidSettings,
    setpoint: f32,
    integral: f32,
    prev_error: Option<f32>,
    output_max: f32,
    last: PidRuntimeParameters,
}

impl PidController {
    pub fn new(settings: PidSettings, setpoint: f32) -> Self {
        Self {
            settings,
            setpoint,
            integral: 0.0,
            prev_error: None,
            output_max: SUPER_CYCLE_SLOTS as f32,
            last: PidRuntimeParameters::default(),
        }
    }

    pub fn set_target(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    pub fn target(&self) -> f32 {
        self.setpoint
    }

    /// Swap gains.  The accumulated integral is re-clamped to the new band.
    /// Settings carrying a NaN or infinity are ignored.
    pub fn set_settings(&mut self, settings: PidSettings) {
        if !settings.is_finite() {
            return;
        }
        self.settings = settings;
        self.integral = self.clamp_integral(self.integral);
    }

    /// One PID step.  `feed_forward` is added after the terms, before clamping.
    pub fn compute(&mut self, measurement: f32, feed_forward: f32) -> f32 {
        let error = self.setpoint - measurement;

        let p = self.settings.kp * error;

        self.integral = self.clamp_integral(self.integral + error);
        let i = self.settings.ki * self.integral;

        let d = match self.prev_error {
            Some(prev) => self.settings.kd * (error - prev),
            None => 0.0,
        };
        self.prev_error = Some(error);

        self.last = PidRuntimeParameters {
            hysteresis_mode: false,
            p,
            i,
            d,
            integral: self.integral,
        };

        // max/min rather than clamp: a NaN sum lands on 0 instead of panicking
        (p + i + d + feed_forward).max(0.0).min(self.output_max)
    }

    /// Forget history, e.g. after a stretch of bang-bang control.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn runtime_parameters(&self) -> PidRuntimeParameters {
        self.last
    }

    fn clamp_integral(&self, value: f32) -> f32 {
        let lo = self.settings.windup_low.min(self.settings.windup_high);
        let hi = self.settings.windup_high.max(self.settings.windup_low);
        if lo.is_nan() || hi.is_nan() {
            return value;
        }
        value.max(lo).min(hi)
    }
}
