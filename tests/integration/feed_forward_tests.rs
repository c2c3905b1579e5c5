//! What the controller hands its boiler controllers on each super-cycle:
//! brew feed-forward across a shot, and forced bang-bang during heat-up.
//!
//! Refills happen only on the tick the 25-slot schedule runs dry, so every
//! test here counts calls on the recording boilers instead of ticks.

use lcc_controller::app::settings::Settings;
use lcc_controller::config::{ControllerConfig, SUPER_CYCLE_SLOTS};
use lcc_controller::control::brew_feed_forward;
use lcc_controller::fsm::RunState;
use lcc_controller::protocol::ControlBoardPacket;

use crate::mock_hw::{RecordingBoiler, Reply, Rig, TICK_US, reading};

type RecordingRig = Rig<RecordingBoiler, RecordingBoiler>;

/// Ticks from one refill to the next.
const CYCLE: usize = SUPER_CYCLE_SLOTS;

/// Milliseconds between two refills.
const CYCLE_MS: u64 = CYCLE as u64 * TICK_US / 1000;

fn rig_with(config: ControllerConfig) -> (RecordingRig, RecordingBoiler, RecordingBoiler) {
    let brew = RecordingBoiler::with_duty(10);
    let service = RecordingBoiler::with_duty(10);
    let rig = Rig::with_boilers(config, Settings::default(), brew.clone(), service.clone());
    (rig, brew, service)
}

fn shot(brew_switch: bool) -> ControlBoardPacket {
    ControlBoardPacket {
        brew_switch,
        ..reading(100.0, 120.0)
    }
}

/// Warm start: the first running tick refills, the next refill is one
/// full cycle later.
fn warm() -> (RecordingRig, RecordingBoiler, RecordingBoiler) {
    let (mut rig, brew, service) = rig_with(ControllerConfig::default());
    rig.running_with(shot(false));
    assert_eq!(rig.ctl.machine_state().run_state, RunState::Normal);
    assert_eq!(brew.call_count(), 1);
    (rig, brew, service)
}

fn expected(elapsed_ms: u64) -> f32 {
    let c = ControllerConfig::default();
    brew_feed_forward(elapsed_ms, c.feed_forward_k, c.feed_forward_m)
}

fn assert_near(got: Option<f32>, want: f32) {
    let got = got.expect("feed-forward while brewing");
    assert!((got - want).abs() < 1e-3, "feed-forward {got}, expected {want}");
}

#[test]
fn idle_refill_has_no_feed_forward() {
    let (mut rig, brew, _) = warm();
    rig.ticks(CYCLE * 3);
    let calls = brew.calls.borrow();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.feed_forward.is_none() && !c.force_hysteresis));
}

#[test]
fn feed_forward_decays_over_the_shot_then_stops() {
    let (mut rig, brew, _) = warm();

    // Brew starts exactly on the next refill tick.
    rig.ticks(CYCLE - 1);
    assert_eq!(brew.call_count(), 1);
    rig.board.steady = Reply::Packet(shot(true));
    rig.tick();
    assert_eq!(brew.call_count(), 2);
    assert_near(brew.last_call().and_then(|c| c.feed_forward), 5.0);

    // 2.5 s per cycle: 5.0, 4.375, ... 0.0 at 20 s, then held at zero.
    for cycle in 1..=10u64 {
        rig.ticks(CYCLE);
        let call = brew.last_call().unwrap();
        assert_near(call.feed_forward, expected(cycle * CYCLE_MS));
        assert!(!call.force_hysteresis);
    }
    assert_eq!(brew.call_count(), 12);
    assert_near(brew.last_call().and_then(|c| c.feed_forward), 0.0);

    rig.board.steady = Reply::Packet(shot(false));
    rig.ticks(CYCLE);
    assert_eq!(brew.call_count(), 13);
    assert_eq!(brew.last_call().unwrap().feed_forward, None);
}

#[test]
fn brew_starting_mid_cycle_is_seen_on_next_refill() {
    let (mut rig, brew, _) = warm();
    rig.ticks(10);
    rig.board.steady = Reply::Packet(shot(true));
    rig.tick();
    // 12 of 25 slots used; the refill is 14 ticks after the brew began.
    rig.ticks(CYCLE - 12);
    assert_eq!(brew.call_count(), 1);
    rig.tick();
    assert_eq!(brew.call_count(), 2);
    assert_near(
        brew.last_call().and_then(|c| c.feed_forward),
        expected(14 * TICK_US / 1000),
    );
}

#[test]
fn service_boiler_never_gets_feed_forward() {
    let (mut rig, _, service) = warm();
    rig.ticks(CYCLE - 1);
    rig.board.steady = Reply::Packet(shot(true));
    rig.ticks(CYCLE * 3);
    let calls = service.calls.borrow();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.feed_forward.is_none() && !c.force_hysteresis));
}

#[test]
fn heatup_forces_hysteresis_until_normal() {
    let config = ControllerConfig {
        heatup_stage2_secs: 5,
        ..ControllerConfig::default()
    };
    let heatup_target = config.heatup_brew_set_point;
    let (mut rig, brew, service) = rig_with(config);

    rig.running_with(reading(20.0, 20.0));
    assert_eq!(rig.ctl.machine_state().run_state, RunState::HeatupStage1);
    assert!(brew.last_call().unwrap().force_hysteresis);
    assert_eq!(brew.set_point.get(), heatup_target);

    rig.board.steady = Reply::Packet(reading(129.5, 120.0));
    rig.ticks(CYCLE);
    assert_eq!(rig.ctl.machine_state().run_state, RunState::HeatupStage2);
    assert_eq!(brew.call_count(), 2);
    assert!(brew.last_call().unwrap().force_hysteresis);

    // Stage 2 lasts 50 ticks from its first tick; 2 more cycles pass it.
    rig.ticks(CYCLE * 2);
    assert_eq!(rig.ctl.machine_state().run_state, RunState::Normal);
    assert_eq!(brew.call_count(), 4);
    assert!(!brew.last_call().unwrap().force_hysteresis);
    assert_ne!(brew.set_point.get(), heatup_target);

    assert!(service.calls.borrow().iter().all(|c| !c.force_hysteresis));
}
