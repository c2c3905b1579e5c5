//! System controller — the 100 ms control tick.
//!
//! [`SystemController`] owns the machine state, the duty scheduler, the
//! water-path supervisor and both temperature averages.  Everything
//! outside the core is reached through port traits passed into
//! [`SystemController::tick`].
//!
//! ```text
//!           ┌───────────── one tick ─────────────────────────────────┐
//!  UART ◀── │ send (safe | pending) ─▶ read ≤ deadline ─▶ validate   │
//!           │        │                                     │         │
//!           │        │            ┌──────── transition() ◀─┘         │
//!           │        │            ▼                                  │
//!  cmds ──▶ │ drain commands ─▶ flow + duty schedule ─▶ encode/check │
//!           │                                             │          │
//!  status ◀─│ snapshot (drop if full) ◀───────────────────┘          │
//!  NVS   ◀──│ write settings if changed ─▶ sleep until deadline      │
//!           └────────────────────────────────────────────────────────┘
//! ```

use log::{debug, error, info, trace, warn};

use crate::config::ControllerConfig;
use crate::control::{PidRuntimeParameters, brew_feed_forward};
use crate::error::ConfigError;
use crate::filters::MovingAverage;
use crate::fsm::{
    BailReason, CoalescedState, Effect, Lifecycle, MachineEvent, MachineState, SetPoints,
    at_set_point, coalesced_state, resolve_set_points, transition,
};
use crate::protocol::{
    CONTROL_BOARD_PACKET_LEN, ControlBoardPacket, ControlBoardRawPacket, LccPacket, LccRawPacket,
};
use crate::safety::{BrewEdge, FlowSupervisor};
use crate::scheduler::{DutyRequest, DutyScheduler, share_power};

use super::commands::Command;
use super::events::{ControllerEvent, StatusSnapshot};
use super::ports::{
    BoilerController, Clock, CommandSource, EventSink, PacketCodec, SettingsStore, StatusSink,
    Transport,
};
use super::settings::{Settings, SystemSettings};

/// Samples in each boiler temperature average.
pub const TEMPERATURE_WINDOW: usize = 5;

const US_PER_MINUTE: u64 = 60_000_000;

// ───────────────────────────────────────────────────────────────
// SystemController
// ───────────────────────────────────────────────────────────────

/// The control core.  `P` decodes/encodes packets, `B` and `S` drive the
/// brew and service boilers.
pub struct SystemController<P, B, S> {
    config: ControllerConfig,
    codec: P,
    brew: B,
    service: S,
    settings: SystemSettings,

    machine: MachineState,
    scheduler: DutyScheduler,
    flow: FlowSupervisor,
    brew_average: MovingAverage<TEMPERATURE_WINDOW>,
    service_average: MovingAverage<TEMPERATURE_WINDOW>,

    /// All-off frame, encoded once at construction.
    safe_raw: LccRawPacket,
    /// Frame computed last tick, sent this tick unless bailed.
    pending_raw: LccRawPacket,
    inbound_raw: ControlBoardRawPacket,
    last_inbound: ControlBoardPacket,
    outbound: LccPacket,
    setpoints_stale: bool,

    brew_runtime: PidRuntimeParameters,
    service_runtime: PidRuntimeParameters,

    last_brew_started_at: Option<u64>,
    last_brew_ended_at: Option<u64>,
    last_sleep_mode_exit_at: Option<u64>,
    planned_auto_sleep_at: Option<u64>,
}

impl<P, B, S> SystemController<P, B, S>
where
    P: PacketCodec,
    B: BoilerController,
    S: BoilerController,
{
    /// Build the controller.  Starts in `NotStarted`, sending only the
    /// safe packet until a `Begin` command arrives.
    pub fn new(
        config: ControllerConfig,
        codec: P,
        brew: B,
        service: S,
        settings: SystemSettings,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let safe_raw = codec.safe_packet();
        let flow = FlowSupervisor::new(&config);

        let mut controller = Self {
            config,
            codec,
            brew,
            service,
            settings,
            machine: MachineState::new(),
            scheduler: DutyScheduler::new(),
            flow,
            brew_average: MovingAverage::new(),
            service_average: MovingAverage::new(),
            safe_raw,
            pending_raw: safe_raw,
            inbound_raw: [0; CONTROL_BOARD_PACKET_LEN],
            last_inbound: ControlBoardPacket::default(),
            outbound: LccPacket::default(),
            setpoints_stale: false,
            brew_runtime: PidRuntimeParameters::default(),
            service_runtime: PidRuntimeParameters::default(),
            last_brew_started_at: None,
            last_brew_ended_at: None,
            last_sleep_mode_exit_at: None,
            planned_auto_sleep_at: None,
        };
        controller.update_controller_settings();
        info!("SystemController: created, waiting for Begin");
        Ok(controller)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control tick.  Returns after the tick deadline.
    ///
    /// `hw` provides both the serial link and the clock so a read can be
    /// bounded by the same deadline the tick sleeps to.
    pub fn tick<H, Q, O, St, E>(
        &mut self,
        hw: &mut H,
        commands: &mut Q,
        status: &mut O,
        store: &mut St,
        sink: &mut E,
    ) where
        H: Transport + Clock,
        Q: CommandSource,
        O: StatusSink,
        St: SettingsStore,
        E: EventSink,
    {
        if self.machine.lifecycle == Lifecycle::NotStarted {
            let deadline = hw.now_us() + self.config.tick_period_us();
            hw.clear_input();
            self.send(hw, self.safe_raw);
            hw.sleep_until(deadline);
            let now = hw.now_us();
            self.handle_commands(commands, now, sink);
            return;
        }

        // 1. Transmit: safe unless fully running.
        hw.clear_input();
        let frame = if self.only_send_safe_packets() {
            self.safe_raw
        } else {
            self.pending_raw
        };
        self.send(hw, frame);
        let deadline = hw.now_us() + self.config.tick_period_us();

        // 2. Bounded read + validation.
        let inbound = match hw.read_exact_until(&mut self.inbound_raw, deadline) {
            Err(e) => {
                debug!("Control board read failed: {}", e);
                self.apply(MachineEvent::ReadTimedOut, sink);
                None
            }
            Ok(()) => match self.codec.parse_control_board(&self.inbound_raw) {
                Ok(packet) => Some(packet),
                Err(e) => {
                    debug!("Control board packet rejected: {}", e);
                    self.apply(MachineEvent::InboundInvalid, sink);
                    None
                }
            },
        };
        let now = hw.now_us();
        if let Some(packet) = inbound {
            self.last_inbound = packet;
        }

        // 3. Recovery while bailed, run-state staging while running.
        if self.machine.is_bailed() {
            if inbound.is_some() {
                self.apply(MachineEvent::InboundValid { now_us: now }, sink);
            }
        } else if let Some(packet) = inbound {
            let sleeping = self.settings.get().sleep_mode;
            self.apply(
                MachineEvent::BrewTemperature {
                    celsius: packet.brew_boiler_temperature,
                    now_us: now,
                    sleeping,
                },
                sink,
            );
        }
        self.flush_setpoints();

        // 4. A stale buffer must never be parsed twice.
        self.inbound_raw = [0; CONTROL_BOARD_PACKET_LEN];

        // 5. Commands, then automation.
        self.handle_commands(commands, now, sink);
        self.check_auto_sleep(now, sink);

        // 6. Outbound packet for the next tick.  Control runs only on a
        //    packet read this tick; an unbail on a failed read stays safe.
        self.outbound = match inbound {
            Some(_) if !self.machine.is_bailed() => self.handle_control_board_packet(now, sink),
            _ => self.codec.decode_lcc(&self.safe_raw),
        };

        let raw = self.codec.encode_lcc(&self.outbound);
        if let Err(e) = self.codec.validate_lcc(&raw) {
            error!("Outbound packet failed self-check: {}", e);
            self.apply(MachineEvent::OutboundInvalid, sink);
        }
        self.pending_raw = raw;

        // 7. Status, never blocking.
        let snapshot = self.snapshot(now);
        if status.is_full() || status.try_add(snapshot).is_err() {
            trace!("Status queue full, snapshot dropped");
        }

        // 8. Persistence, then wait out the tick.
        self.settings.write_if_changed(store);
        hw.sleep_until(deadline);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn machine_state(&self) -> &MachineState {
        &self.machine
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    /// Parsed outbound packet computed on the last tick.
    pub fn outbound(&self) -> LccPacket {
        self.outbound
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn coalesced_state(&self) -> CoalescedState {
        let s = self.settings.get();
        coalesced_state(&self.machine, s.sleep_mode, self.temperatures_at_set_point())
    }

    /// Build the status message for `now_us`.
    pub fn snapshot(&self, now_us: u64) -> StatusSnapshot {
        let s = self.settings.get();
        StatusSnapshot {
            timestamp_us: now_us,

            brew_temperature: self.brew_average.average(),
            brew_set_point: s.brew_target,
            brew_pid_settings: s.brew_pid,
            brew_pid_runtime: self.brew_runtime,

            service_temperature: self.service_average.average(),
            service_set_point: s.service_target,
            service_pid_settings: s.service_pid,
            service_pid_runtime: self.service_runtime,

            brew_ssr_active: self.outbound.brew_boiler_ssr_on,
            service_ssr_active: self.outbound.service_boiler_ssr_on,

            eco_mode: s.eco_mode,
            sleep_mode: s.sleep_mode,
            state: self.coalesced_state(),
            run_state: self.machine.run_state,
            bail_reason: self.machine.bail_reason,
            bail_count: self.machine.bail_count,

            currently_brewing: self.last_inbound.brew_switch && self.outbound.pump_on,
            currently_filling_service_boiler: self.outbound.pump_on
                && self.outbound.service_boiler_solenoid_open,
            water_tank_low: self.last_inbound.water_tank_empty,

            last_sleep_mode_exit_at: self.last_sleep_mode_exit_at,
            last_brew_started_at: self.last_brew_started_at,
            last_brew_ended_at: self.last_brew_ended_at,
            planned_auto_sleep_at: self.planned_auto_sleep_at,
        }
    }

    // ── Internal: transport ───────────────────────────────────

    fn only_send_safe_packets(&self) -> bool {
        self.machine.lifecycle != Lifecycle::Running
    }

    fn send(&self, hw: &mut impl Transport, frame: LccRawPacket) {
        if let Err(e) = hw.write_all(&frame) {
            warn!("Control board write failed: {}", e);
        }
    }

    // ── Internal: state machine ───────────────────────────────

    fn apply(&mut self, event: MachineEvent, sink: &mut impl EventSink) {
        let (next, effects) = transition(self.machine, event, &self.config);
        self.machine = next;

        for effect in effects {
            match effect {
                Effect::RecomputeSetpoints => self.setpoints_stale = true,
                Effect::Emit(ev) => {
                    log_transition(&ev);
                    sink.emit(&ev);
                }
            }
        }
    }

    fn flush_setpoints(&mut self) {
        if self.setpoints_stale {
            self.update_controller_settings();
        }
    }

    /// Push gains and effective setpoints into both boiler controllers.
    fn update_controller_settings(&mut self) {
        let s = *self.settings.get();
        self.brew.set_pid_parameters(s.brew_pid);
        self.service.set_pid_parameters(s.service_pid);

        let sp = resolve_set_points(
            self.machine.run_state,
            s.sleep_mode,
            s.brew_target,
            s.service_target,
            &self.config,
        );
        self.brew.update_set_point(sp.brew);
        self.service.update_set_point(sp.service);
        self.setpoints_stale = false;
    }

    fn temperatures_at_set_point(&self) -> bool {
        let s = self.settings.get();
        at_set_point(
            self.last_inbound.brew_boiler_temperature,
            self.last_inbound.service_boiler_temperature,
            SetPoints {
                brew: s.brew_target,
                service: s.service_target,
            },
            s.eco_mode,
            &self.config,
        )
    }

    // ── Internal: commands ────────────────────────────────────

    fn handle_commands(
        &mut self,
        commands: &mut impl CommandSource,
        now_us: u64,
        sink: &mut impl EventSink,
    ) {
        while !commands.is_empty() {
            let Some(frame) = commands.remove() else {
                break;
            };
            match Command::try_from(frame) {
                Ok(cmd) => self.apply_command(cmd, now_us, sink),
                Err(e) => warn!("Command ignored: {}", e),
            }
        }
        self.update_controller_settings();
    }

    fn apply_command(&mut self, cmd: Command, now_us: u64, sink: &mut impl EventSink) {
        debug!("Command: {:?}", cmd);
        match cmd {
            Command::SetBrewSetPoint(t) => self.settings.set_brew_target(t),
            Command::SetBrewPidParameters(p) => self.settings.set_brew_pid(p),
            Command::SetServiceSetPoint(t) => self.settings.set_service_target(t),
            Command::SetServicePidParameters(p) => self.settings.set_service_pid(p),
            Command::SetEcoMode(on) => self.settings.set_eco_mode(on),
            Command::SetSleepMode(on) => self.set_sleep_mode(on, now_us, sink),
            Command::SetAutoSleepMinutes(m) => {
                self.settings.set_auto_sleep_minutes(m);
                self.plan_auto_sleep(now_us);
            }
            Command::Unbail => self.apply(MachineEvent::Unbail, sink),
            Command::TriggerFirstRun => {}
            Command::Begin => {
                let was_started = self.machine.lifecycle != Lifecycle::NotStarted;
                self.apply(MachineEvent::Begin, sink);
                if !was_started {
                    self.plan_auto_sleep(now_us);
                }
            }
        }
    }

    fn set_sleep_mode(&mut self, on: bool, now_us: u64, sink: &mut impl EventSink) {
        let changed = self.settings.get().sleep_mode != on;
        self.settings.set_sleep_mode(on);
        if !on {
            self.last_sleep_mode_exit_at = Some(now_us);
            self.plan_auto_sleep(now_us);
        }
        if changed {
            self.apply(MachineEvent::SleepModeChanged { sleeping: on }, sink);
        }
    }

    // ── Internal: auto-sleep ──────────────────────────────────

    fn plan_auto_sleep(&mut self, now_us: u64) {
        let minutes = u64::from(self.settings.get().auto_sleep_minutes);
        self.planned_auto_sleep_at = if minutes == 0 || self.flow.brew_started_at().is_some() {
            None
        } else {
            Some(now_us + minutes * US_PER_MINUTE)
        };
    }

    fn check_auto_sleep(&mut self, now_us: u64, sink: &mut impl EventSink) {
        if !self.machine.is_running() || self.settings.get().sleep_mode {
            return;
        }
        let Some(at) = self.planned_auto_sleep_at else {
            return;
        };
        if now_us < at {
            return;
        }

        self.planned_auto_sleep_at = None;
        sink.emit(&ControllerEvent::AutoSleep);
        info!("Auto-sleep: idle timeout reached");
        self.set_sleep_mode(true, now_us, sink);
        self.flush_setpoints();
    }

    // ── Internal: water path + power sharing ──────────────────

    fn handle_control_board_packet(&mut self, now_us: u64, sink: &mut impl EventSink) -> LccPacket {
        let packet = self.last_inbound;
        let flow = self.flow.evaluate(&packet, now_us);

        match flow.edge {
            Some(BrewEdge::Started) => {
                self.last_brew_started_at = Some(now_us);
                self.planned_auto_sleep_at = None;
                let ev = ControllerEvent::BrewStarted { at_us: now_us };
                log_transition(&ev);
                sink.emit(&ev);
            }
            Some(BrewEdge::Ended { started_at }) => {
                self.last_brew_ended_at = Some(now_us);
                self.plan_auto_sleep(now_us);
                let ev = ControllerEvent::BrewEnded {
                    duration_ms: now_us.saturating_sub(started_at) / 1000,
                };
                log_transition(&ev);
                sink.emit(&ev);
            }
            None => {}
        }

        self.brew_average.add_value(packet.brew_boiler_temperature);
        self.service_average.add_value(packet.service_boiler_temperature);

        if self.scheduler.needs_refill() {
            let feed_forward = if flow.brewing {
                self.flow.brew_elapsed_ms(now_us).map(|ms| {
                    brew_feed_forward(ms, self.config.feed_forward_k, self.config.feed_forward_m)
                })
            } else {
                None
            };
            let force_hysteresis = self.machine.run_state.is_heatup();

            let brew = self.brew.control_signal(
                self.brew_average.average(),
                feed_forward,
                force_hysteresis,
            );
            let mut service =
                self.service
                    .control_signal(self.service_average.average(), None, false);
            if self.settings.get().eco_mode {
                service = 0;
            }

            let request = DutyRequest { brew, service };
            let grant = share_power(request, flow.brewing, self.config.idle_brew_share);
            self.scheduler.refill(grant);
            debug!(
                "Duty: requested {}/{}, granted {}/{}/{} (brewing={})",
                brew,
                service,
                grant.brew,
                grant.service,
                grant.neither(),
                flow.brewing
            );
        }

        let Some(slot) = self.scheduler.next_slot() else {
            error!("Duty schedule empty after refill");
            self.apply(MachineEvent::SchedulerUnderrun, sink);
            return self.codec.decode_lcc(&self.safe_raw);
        };

        self.brew_runtime = self.brew.runtime_parameters();
        self.service_runtime = self.service.runtime_parameters();

        LccPacket {
            brew_boiler_ssr_on: slot.brew_ssr_on(),
            service_boiler_ssr_on: slot.service_ssr_on(),
            pump_on: flow.pump_on,
            service_boiler_solenoid_open: flow.solenoid_open,
        }
    }
}

fn log_transition(ev: &ControllerEvent) {
    match ev {
        ControllerEvent::Bailed {
            reason: BailReason::SchedulerUnderrun,
            ..
        } => error!("Hard bail: scheduler underrun"),
        ControllerEvent::Bailed { reason, hard: true } => warn!("Hard bail: {:?}", reason),
        ControllerEvent::Bailed { reason, hard: false } => warn!("Soft bail: {:?}", reason),
        ControllerEvent::Recovered => info!("Soft bail cleared after clean communication"),
        ControllerEvent::Unbailed => info!("Bail cleared by operator"),
        ControllerEvent::Started => info!("Controller started"),
        ControllerEvent::RunStateChanged { from, to } => {
            info!("Run state: {:?} -> {:?}", from, to);
        }
        ControllerEvent::BrewStarted { .. } => info!("Brew started"),
        ControllerEvent::BrewEnded { duration_ms } => info!("Brew ended after {} ms", duration_ms),
        ControllerEvent::SleepModeChanged { sleeping } => info!("Sleep mode: {}", sleeping),
        ControllerEvent::AutoSleep => {}
    }
}
