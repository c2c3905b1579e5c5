//! Bang-bang controllers.
//!
//! `HysteresisController` drives the service boiler.  `HybridController`
//! drives the brew boiler: bang-bang far from the setpoint (or when the
//! caller forces it during heatup), PID close to it.

use super::pid::{PidController, PidRuntimeParameters, PidSettings};
use crate::app::ports::BoilerController;
use crate::config::SUPER_CYCLE_SLOTS;

const FULL_DUTY: u8 = SUPER_CYCLE_SLOTS as u8;

// ---------------------------------------------------------------------------
// Hysteresis
// ---------------------------------------------------------------------------

/// Full power below `setpoint - delta`, off at or above `setpoint`,
/// unchanged in between.
#[derive(Debug, Clone)]
pub struct HysteresisController {
    setpoint: f32,
    delta: f32,
    heating: bool,
}

impl HysteresisController {
    pub fn new(setpoint: f32, delta: f32) -> Self {
        Self {
            setpoint,
            delta,
            heating: false,
        }
    }

    pub fn update(&mut self, temperature: f32) -> u8 {
        if temperature < self.setpoint - self.delta {
            self.heating = true;
        } else if temperature >= self.setpoint {
            self.heating = false;
        }
        if self.heating { FULL_DUTY } else { 0 }
    }

    pub fn set_point(&self) -> f32 {
        self.setpoint
    }
}

impl BoilerController for HysteresisController {
    fn control_signal(
        &mut self,
        temperature: f32,
        _feed_forward: Option<f32>,
        _force_hysteresis: bool,
    ) -> u8 {
        self.update(temperature)
    }

    fn update_set_point(&mut self, target: f32) {
        self.setpoint = target;
    }

    fn set_pid_parameters(&mut self, _settings: PidSettings) {}

    fn runtime_parameters(&self) -> PidRuntimeParameters {
        PidRuntimeParameters {
            hysteresis_mode: true,
            ..PidRuntimeParameters::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Hybrid
// ---------------------------------------------------------------------------

/// PID inside `setpoint ± hybrid_delta`, hysteresis outside it.
pub struct HybridController {
    pid: PidController,
    hysteresis: HysteresisController,
    hybrid_delta: f32,
    in_hysteresis: bool,
}

impl HybridController {
    pub fn new(
        setpoint: f32,
        hybrid_delta: f32,
        settings: PidSettings,
        hysteresis_delta: f32,
    ) -> Self {
        Self {
            pid: PidController::new(settings, setpoint),
            hysteresis: HysteresisController::new(setpoint, hysteresis_delta),
            hybrid_delta,
            in_hysteresis: false,
        }
    }
}

impl BoilerController for HybridController {
    fn control_signal(
        &mut self,
        temperature: f32,
        feed_forward: Option<f32>,
        force_hysteresis: bool,
    ) -> u8 {
        let far = (self.pid.target() - temperature).abs() > self.hybrid_delta;
        if force_hysteresis || far {
            self.in_hysteresis = true;
            return self.hysteresis.update(temperature);
        }

        if self.in_hysteresis {
            // Stale integral from before the bang-bang stretch.
            self.pid.reset();
            self.in_hysteresis = false;
        }
        let out = self.pid.compute(temperature, feed_forward.unwrap_or(0.0));
        out.round() as u8
    }

    fn update_set_point(&mut self, target: f32) {
        self.pid.set_target(target);
        self.hysteresis.update_set_point(target);
    }

    fn set_pid_parameters(&mut self, settings: PidSettings) {
        self.pid.set_settings(settings);
    }

    fn runtime_parameters(&self) -> PidRuntimeParameters {
        if self.in_hysteresis {
            PidRuntimeParameters {
                hysteresis_mode: true,
                ..PidRuntimeParameters::default()
            }
        } else {
            self.pid.runtime_parameters()
        }
    }
}
