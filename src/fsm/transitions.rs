//! Transition function for the lifecycle and run-state machines.

use super::{BailReason, Lifecycle, MachineState, RunState};
use crate::app::events::ControllerEvent;
use crate::config::ControllerConfig;

/// Inputs that can move the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MachineEvent {
    /// Operator started the controller.
    Begin,
    /// Operator cleared a bail.
    Unbail,
    /// No complete inbound packet before the tick deadline.
    ReadTimedOut,
    /// Inbound packet arrived but failed validation.
    InboundInvalid,
    /// Inbound packet arrived and validated.
    InboundValid { now_us: u64 },
    /// Our own outbound packet failed validation.
    OutboundInvalid,
    /// The duty schedule was empty when a slot was needed.
    SchedulerUnderrun,
    /// Fresh brew boiler temperature while running.
    BrewTemperature {
        celsius: f32,
        now_us: u64,
        sleeping: bool,
    },
    /// Sleep mode was switched.
    SleepModeChanged { sleeping: bool },
}

/// Side effects the controller applies after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Effective setpoints may have changed.
    RecomputeSetpoints,
    Emit(ControllerEvent),
}

/// A transition never produces more than a handful of effects.
pub type Effects = heapless::Vec<Effect, 4>;

fn push(effects: &mut Effects, effect: Effect) {
    let pushed = effects.push(effect);
    debug_assert!(pushed.is_ok(), "effect buffer overflow");
}

/// Advance the machine by one event.
pub fn transition(
    state: MachineState,
    event: MachineEvent,
    cfg: &ControllerConfig,
) -> (MachineState, Effects) {
    let mut s = state;
    let mut fx = Effects::new();

    match event {
        MachineEvent::Begin => {
            if s.lifecycle == Lifecycle::NotStarted {
                s.lifecycle = Lifecycle::Running;
                s.run_state = RunState::Undetermined;
                push(&mut fx, Effect::Emit(ControllerEvent::Started));
                push(&mut fx, Effect::RecomputeSetpoints);
            }
        }

        MachineEvent::Unbail => {
            if s.is_bailed() {
                clear_bail(&mut s);
                push(&mut fx, Effect::Emit(ControllerEvent::Unbailed));
                push(&mut fx, Effect::RecomputeSetpoints);
            }
        }

        MachineEvent::ReadTimedOut => {
            soft_bail(&mut s, BailReason::ControlBoardUnresponsive, &mut fx);
        }

        MachineEvent::InboundInvalid => {
            soft_bail(&mut s, BailReason::ControlBoardPacketInvalid, &mut fx);
        }

        MachineEvent::InboundValid { now_us } => {
            if s.lifecycle == Lifecycle::SoftBailed {
                match s.recovery_since {
                    None => s.recovery_since = Some(now_us),
                    Some(since) if now_us.saturating_sub(since) >= cfg.recovery_window_us => {
                        clear_bail(&mut s);
                        push(&mut fx, Effect::Emit(ControllerEvent::Recovered));
                        push(&mut fx, Effect::RecomputeSetpoints);
                    }
                    Some(_) => {}
                }
            }
        }

        MachineEvent::OutboundInvalid => {
            hard_bail(&mut s, BailReason::OutboundPacketInvalid, &mut fx);
        }

        MachineEvent::SchedulerUnderrun => {
            hard_bail(&mut s, BailReason::SchedulerUnderrun, &mut fx);
        }

        MachineEvent::BrewTemperature {
            celsius,
            now_us,
            sleeping,
        } => {
            if s.is_running() {
                advance_run_state(&mut s, celsius, now_us, sleeping, cfg, &mut fx);
            }
        }

        MachineEvent::SleepModeChanged { sleeping } => {
            if sleeping && s.run_state == RunState::HeatupStage2 {
                s.heatup_stage2_since = None;
            }
            push(
                &mut fx,
                Effect::Emit(ControllerEvent::SleepModeChanged { sleeping }),
            );
            push(&mut fx, Effect::RecomputeSetpoints);
        }
    }

    (s, fx)
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn soft_bail(s: &mut MachineState, reason: BailReason, fx: &mut Effects) {
    match s.lifecycle {
        Lifecycle::Running => {
            s.lifecycle = Lifecycle::SoftBailed;
            s.bail_count = s.bail_count.saturating_add(1);
            if s.bail_reason == BailReason::None {
                s.bail_reason = reason;
            }
            s.recovery_since = None;
            push(
                fx,
                Effect::Emit(ControllerEvent::Bailed {
                    reason: s.bail_reason,
                    hard: false,
                }),
            );
        }
        // A failed read restarts the recovery window.
        Lifecycle::SoftBailed => s.recovery_since = None,
        Lifecycle::HardBailed | Lifecycle::NotStarted => {}
    }
}

fn hard_bail(s: &mut MachineState, reason: BailReason, fx: &mut Effects) {
    let changed = s.lifecycle != Lifecycle::HardBailed || s.bail_reason != reason;
    if s.lifecycle != Lifecycle::HardBailed {
        s.bail_count = s.bail_count.saturating_add(1);
    }
    s.lifecycle = Lifecycle::HardBailed;
    s.bail_reason = reason;
    s.recovery_since = None;
    if changed {
        push(fx, Effect::Emit(ControllerEvent::Bailed { reason, hard: true }));
    }
}

fn clear_bail(s: &mut MachineState) {
    s.lifecycle = Lifecycle::Running;
    s.run_state = RunState::Undetermined;
    s.bail_reason = BailReason::None;
    s.recovery_since = None;
    s.heatup_stage2_since = None;
}

fn advance_run_state(
    s: &mut MachineState,
    celsius: f32,
    now_us: u64,
    sleeping: bool,
    cfg: &ControllerConfig,
    fx: &mut Effects,
) {
    let from = s.run_state;
    let to = match from {
        RunState::Undetermined if celsius < cfg.heatup_skip_temp => RunState::HeatupStage1,
        RunState::Undetermined => RunState::Normal,
        RunState::HeatupStage1 if celsius > cfg.heatup_stage2_temp => {
            s.heatup_stage2_since = Some(now_us);
            RunState::HeatupStage2
        }
        RunState::HeatupStage2 => match s.heatup_stage2_since {
            None => {
                // Woken from sleep: the stage restarts now.
                if !sleeping {
                    s.heatup_stage2_since = Some(now_us);
                }
                from
            }
            Some(since) if now_us.saturating_sub(since) >= cfg.heatup_stage2_us() => {
                s.heatup_stage2_since = None;
                RunState::Normal
            }
            Some(_) => from,
        },
        RunState::HeatupStage1 | RunState::Normal => from,
    };

    if to != from {
        s.run_state = to;
        push(fx, Effect::Emit(ControllerEvent::RunStateChanged { from, to }));
        push(fx, Effect::RecomputeSetpoints);
    }
}
