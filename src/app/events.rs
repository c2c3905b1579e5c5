//! Outbound data from the controller.
//!
//! Two channels leave the control core:
//!
//! - a [`StatusSnapshot`] every tick, pushed to the companion core
//!   through the status queue (dropped when the queue is full);
//! - a [`ControllerEvent`] on every observable transition, delivered to
//!   the [`EventSink`](super::ports::EventSink) port.

use serde::{Deserialize, Serialize};

use crate::control::{PidRuntimeParameters, PidSettings};
use crate::fsm::{BailReason, CoalescedState, RunState};

/// Observable transitions emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// `Begin` took the controller out of `NotStarted`.
    Started,

    /// Entered (or escalated) a bail.
    Bailed { reason: BailReason, hard: bool },

    /// Soft bail cleared by clean communication.
    Recovered,

    /// Bail cleared by the operator.
    Unbailed,

    RunStateChanged { from: RunState, to: RunState },

    BrewStarted { at_us: u64 },

    BrewEnded { duration_ms: u64 },

    SleepModeChanged { sleeping: bool },

    /// Idle timeout elapsed and sleep mode was entered automatically.
    AutoSleep,
}

/// Per-tick status published to the companion core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp_us: u64,

    // Brew boiler
    pub brew_temperature: f32,
    pub brew_set_point: f32,
    pub brew_pid_settings: PidSettings,
    pub brew_pid_runtime: PidRuntimeParameters,

    // Service boiler
    pub service_temperature: f32,
    pub service_set_point: f32,
    pub service_pid_settings: PidSettings,
    pub service_pid_runtime: PidRuntimeParameters,

    // Outputs
    pub brew_ssr_active: bool,
    pub service_ssr_active: bool,

    // Modes and state
    pub eco_mode: bool,
    pub sleep_mode: bool,
    pub state: CoalescedState,
    pub run_state: RunState,
    pub bail_reason: BailReason,
    pub bail_count: u32,

    // Water path
    pub currently_brewing: bool,
    pub currently_filling_service_boiler: bool,
    pub water_tank_low: bool,

    // Timestamps (monotonic µs)
    pub last_sleep_mode_exit_at: Option<u64>,
    pub last_brew_started_at: Option<u64>,
    pub last_brew_ended_at: Option<u64>,
    pub planned_auto_sleep_at: Option<u64>,
}

impl StatusSnapshot {
    /// Duration of the last completed brew, if one has finished since boot.
    pub fn previous_brew_duration_ms(&self) -> Option<u64> {
        if self.currently_brewing {
            return None;
        }
        match (self.last_brew_started_at, self.last_brew_ended_at) {
            (Some(start), Some(end)) if end >= start => Some((end - start) / 1000),
            _ => None,
        }
    }
}
