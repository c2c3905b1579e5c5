//! Heat-up staging across whole ticks, including sleep during stage 2.

use lcc_controller::app::commands::Command;
use lcc_controller::app::events::ControllerEvent;
use lcc_controller::app::settings::Settings;
use lcc_controller::config::ControllerConfig;
use lcc_controller::fsm::{CoalescedState, RunState};

use crate::mock_hw::{Reply, Rig, reading};

/// Stage 2 hold shortened to 5 s = 50 ticks.
const STAGE2_TICKS: usize = 50;

fn short_stage2() -> Rig {
    let config = ControllerConfig {
        heatup_stage2_secs: 5,
        ..ControllerConfig::default()
    };
    Rig::with(config, Settings::default())
}

fn cold_start() -> Rig {
    let mut rig = short_stage2();
    rig.running_with(reading(20.0, 20.0));
    rig
}

/// Cold start, then cross into stage 2 on this tick.
fn in_stage2() -> Rig {
    let mut rig = cold_start();
    rig.board.steady = Reply::Packet(reading(129.5, 120.0));
    rig.tick();
    assert_eq!(rig.ctl.machine_state().run_state, RunState::HeatupStage2);
    rig
}

fn run_state(rig: &Rig) -> RunState {
    rig.ctl.machine_state().run_state
}

#[test]
fn cold_boiler_enters_stage1() {
    let rig = cold_start();
    assert_eq!(run_state(&rig), RunState::HeatupStage1);
    assert_eq!(rig.ctl.coalesced_state(), CoalescedState::Heatup);
    assert!(rig.sink.contains(&ControllerEvent::RunStateChanged {
        from: RunState::Undetermined,
        to: RunState::HeatupStage1,
    }));
}

#[test]
fn warm_boiler_skips_heatup() {
    let mut rig = short_stage2();
    rig.running_with(reading(70.0, 110.0));
    assert_eq!(run_state(&rig), RunState::Normal);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, ControllerEvent::RunStateChanged { .. })),
        1
    );
}

#[test]
fn stage1_keeps_service_boiler_off_and_brew_at_full_power() {
    let mut rig = cold_start();
    for _ in 0..60 {
        rig.tick();
        let out = rig.ctl.outbound();
        assert!(!out.service_boiler_ssr_on);
        assert!(out.brew_boiler_ssr_on);
    }
    assert_eq!(run_state(&rig), RunState::HeatupStage1);
}

#[test]
fn stage2_threshold_is_strict() {
    let mut rig = cold_start();
    rig.board.steady = Reply::Packet(reading(128.0, 20.0));
    rig.ticks(10);
    assert_eq!(run_state(&rig), RunState::HeatupStage1);
}

#[test]
fn stage2_holds_for_configured_time_then_normal() {
    let mut rig = in_stage2();
    rig.ticks(STAGE2_TICKS - 1);
    assert_eq!(run_state(&rig), RunState::HeatupStage2);
    rig.tick();
    assert_eq!(run_state(&rig), RunState::Normal);
    assert!(rig.sink.contains(&ControllerEvent::RunStateChanged {
        from: RunState::HeatupStage2,
        to: RunState::Normal,
    }));
}

#[test]
fn stage2_does_not_revert_on_cooling() {
    let mut rig = in_stage2();
    rig.board.steady = Reply::Packet(reading(60.0, 120.0));
    rig.ticks(10);
    assert_eq!(run_state(&rig), RunState::HeatupStage2);
}

#[test]
fn sleep_pauses_stage2_and_wake_restarts_it() {
    let mut rig = in_stage2();
    rig.ticks(10);
    rig.command(Command::SetSleepMode(true));
    rig.tick();
    assert_eq!(rig.ctl.coalesced_state(), CoalescedState::Sleeping);

    // Far past the hold time while asleep.
    rig.ticks(STAGE2_TICKS * 2);
    assert_eq!(run_state(&rig), RunState::HeatupStage2);

    rig.command(Command::SetSleepMode(false));
    rig.tick();
    rig.ticks(STAGE2_TICKS);
    assert_eq!(run_state(&rig), RunState::HeatupStage2);
    rig.tick();
    assert_eq!(run_state(&rig), RunState::Normal);
}

#[test]
fn sleeping_boilers_idle_at_sleep_set_point() {
    let mut rig = in_stage2();
    rig.command(Command::SetSleepMode(true));
    rig.tick();
    // Let the pre-sleep super-cycle drain.
    rig.ticks(30);
    for _ in 0..25 {
        rig.tick();
        let out = rig.ctl.outbound();
        assert!(!out.brew_boiler_ssr_on && !out.service_boiler_ssr_on);
    }
}

#[test]
fn wake_records_exit_time() {
    let mut rig = in_stage2();
    rig.command(Command::SetSleepMode(true));
    rig.tick();
    rig.command(Command::SetSleepMode(false));
    rig.tick();
    let woke = rig.ctl.snapshot(rig.now()).last_sleep_mode_exit_at;
    assert!(woke.is_some_and(|t| t <= rig.now()));
    assert!(rig.sink.contains(&ControllerEvent::SleepModeChanged { sleeping: false }));
}
