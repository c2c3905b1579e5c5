//! Derived views of the machine state: effective setpoints, the
//! at-setpoint predicate and the coalesced external state.

use super::{CoalescedState, Lifecycle, MachineState, RunState};
use crate::config::ControllerConfig;

/// Targets handed to the two boiler controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPoints {
    pub brew: f32,
    pub service: f32,
}

/// Effective setpoints for the current run state.
///
/// Sleep overrides everything.  Heatup stage 1 pushes the brew boiler
/// to the heatup target and keeps the service boiler off; stage 2 lets
/// the service boiler follow its configured target.
pub fn resolve_set_points(
    run_state: RunState,
    sleep_mode: bool,
    brew_target: f32,
    service_target: f32,
    cfg: &ControllerConfig,
) -> SetPoints {
    if sleep_mode {
        return SetPoints {
            brew: cfg.sleep_set_point,
            service: cfg.sleep_set_point,
        };
    }

    match run_state {
        RunState::HeatupStage1 => SetPoints {
            brew: cfg.heatup_brew_set_point,
            service: 0.0,
        },
        RunState::HeatupStage2 => SetPoints {
            brew: cfg.heatup_brew_set_point,
            service: service_target,
        },
        RunState::Undetermined | RunState::Normal => SetPoints {
            brew: brew_target,
            service: service_target,
        },
    }
}

/// Both boilers within tolerance of the user targets.  Eco mode ignores
/// the service boiler.
pub fn at_set_point(
    brew_temperature: f32,
    service_temperature: f32,
    targets: SetPoints,
    eco_mode: bool,
    cfg: &ControllerConfig,
) -> bool {
    let within = |t: f32, target: f32, tol: f32| t >= target - tol && t <= target + tol;

    if !within(brew_temperature, targets.brew, cfg.brew_tolerance) {
        return false;
    }
    eco_mode || within(service_temperature, targets.service, cfg.service_tolerance)
}

/// Project the machine state into the external state reported upstream.
pub fn coalesced_state(state: &MachineState, sleep_mode: bool, at_set_point: bool) -> CoalescedState {
    match state.lifecycle {
        Lifecycle::NotStarted => CoalescedState::Undetermined,
        Lifecycle::SoftBailed | Lifecycle::HardBailed => CoalescedState::Bailed,
        Lifecycle::Running if sleep_mode => CoalescedState::Sleeping,
        Lifecycle::Running => match state.run_state {
            RunState::Undetermined => CoalescedState::Undetermined,
            RunState::HeatupStage1 | RunState::HeatupStage2 => CoalescedState::Heatup,
            RunState::Normal if at_set_point => CoalescedState::Warm,
            RunState::Normal => CoalescedState::Normalizing,
        },
    }
}
