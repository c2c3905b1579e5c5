//! Fuzz target: `fsm::transition`
//!
//! Interprets the input as a stream of machine events (one opcode byte
//! plus payload) and checks the bail bookkeeping after every step.
//!
//! cargo fuzz run fuzz_state_machine

#![no_main]

use libfuzzer_sys::fuzz_target;
use lcc_controller::config::ControllerConfig;
use lcc_controller::fsm::{BailReason, Lifecycle, MachineEvent, MachineState, transition};

fuzz_target!(|data: &[u8]| {
    let cfg = ControllerConfig::default();
    let mut state = MachineState::new();
    let mut now_us = 0u64;

    for chunk in data.chunks(2) {
        let op = chunk[0];
        let arg = chunk.get(1).copied().unwrap_or(0);
        now_us += u64::from(arg) * 50_000;

        let event = match op % 9 {
            0 => MachineEvent::Begin,
            1 => MachineEvent::Unbail,
            2 => MachineEvent::ReadTimedOut,
            3 => MachineEvent::InboundInvalid,
            4 => MachineEvent::InboundValid { now_us },
            5 => MachineEvent::OutboundInvalid,
            6 => MachineEvent::SchedulerUnderrun,
            7 => MachineEvent::BrewTemperature {
                celsius: f32::from(arg),
                now_us,
                sleeping: op & 0x80 != 0,
            },
            _ => MachineEvent::SleepModeChanged {
                sleeping: arg & 1 != 0,
            },
        };

        let (next, _effects) = transition(state, event, &cfg);
        assert_eq!(next.is_bailed(), next.bail_reason != BailReason::None);
        assert!(next.bail_count >= state.bail_count);
        if next.recovery_since.is_some() {
            assert_eq!(next.lifecycle, Lifecycle::SoftBailed);
        }
        state = next;
    }
});
