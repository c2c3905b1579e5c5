//! Mock control board, codec and sinks for integration tests.
//!
//! [`MockBoard`] is both the serial link and the clock.  Time only moves
//! when the controller reads or sleeps, so every run is deterministic.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use lcc_controller::app::commands::{Command, CommandFrame};
use lcc_controller::app::controller::SystemController;
use lcc_controller::app::events::{ControllerEvent, StatusSnapshot};
use lcc_controller::app::ports::{
    BoilerController, Clock, CommandSource, EventSink, PacketCodec, SettingsStore, StatusSink,
    Transport,
};
use lcc_controller::app::settings::{Settings, SystemSettings};
use lcc_controller::config::ControllerConfig;
use lcc_controller::control::{
    HybridController, HysteresisController, PidRuntimeParameters, PidSettings,
};
use lcc_controller::error::{PacketError, StorageError, TransportError};
use lcc_controller::protocol::{
    CONTROL_BOARD_PACKET_LEN, ControlBoardPacket, ControlBoardRawPacket, LccPacket, LccRawPacket,
};

pub const TICK_US: u64 = 100_000;

/// Control board answers this long after our packet goes out.
pub const REPLY_LATENCY_US: u64 = 12_000;

// ── MockCodec ─────────────────────────────────────────────────
//
// Inbound:  [0x81, flags, brew f32 LE, service f32 LE, 0.., sum]
// Outbound: [0x80, flags, 0, 0, sum]

const CB_HEADER: u8 = 0x81;
const LCC_HEADER: u8 = 0x80;

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

pub fn encode_control_board(p: &ControlBoardPacket) -> ControlBoardRawPacket {
    let mut raw = [0u8; CONTROL_BOARD_PACKET_LEN];
    raw[0] = CB_HEADER;
    raw[1] = u8::from(p.brew_switch)
        | u8::from(p.water_tank_empty) << 1
        | u8::from(p.service_boiler_low) << 2;
    raw[2..6].copy_from_slice(&p.brew_boiler_temperature.to_le_bytes());
    raw[6..10].copy_from_slice(&p.service_boiler_temperature.to_le_bytes());
    raw[CONTROL_BOARD_PACKET_LEN - 1] = checksum(&raw[..CONTROL_BOARD_PACKET_LEN - 1]);
    raw
}

#[derive(Clone, Default)]
pub struct MockCodec {
    /// Shared with the test so it can break outbound validation mid-run.
    pub reject_outbound: Rc<Cell<bool>>,
}

impl PacketCodec for MockCodec {
    fn parse_control_board(
        &self,
        raw: &ControlBoardRawPacket,
    ) -> Result<ControlBoardPacket, PacketError> {
        if raw[0] != CB_HEADER {
            return Err(PacketError::BadHeader);
        }
        if checksum(&raw[..CONTROL_BOARD_PACKET_LEN - 1]) != raw[CONTROL_BOARD_PACKET_LEN - 1] {
            return Err(PacketError::BadChecksum(1));
        }
        let f32_at = |i: usize| f32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        Ok(ControlBoardPacket {
            brew_switch: raw[1] & 0b001 != 0,
            water_tank_empty: raw[1] & 0b010 != 0,
            service_boiler_low: raw[1] & 0b100 != 0,
            brew_boiler_temperature: f32_at(2),
            service_boiler_temperature: f32_at(6),
        })
    }

    fn encode_lcc(&self, p: &LccPacket) -> LccRawPacket {
        let flags = u8::from(p.brew_boiler_ssr_on)
            | u8::from(p.service_boiler_ssr_on) << 1
            | u8::from(p.pump_on) << 2
            | u8::from(p.service_boiler_solenoid_open) << 3;
        let mut raw = [LCC_HEADER, flags, 0, 0, 0];
        raw[4] = checksum(&raw[..4]);
        raw
    }

    fn validate_lcc(&self, raw: &LccRawPacket) -> Result<(), PacketError> {
        if self.reject_outbound.get() {
            return Err(PacketError::Invalid(0x40));
        }
        if raw[0] != LCC_HEADER || checksum(&raw[..4]) != raw[4] {
            return Err(PacketError::BadChecksum(0));
        }
        Ok(())
    }

    fn decode_lcc(&self, raw: &LccRawPacket) -> LccPacket {
        LccPacket {
            brew_boiler_ssr_on: raw[1] & 0b0001 != 0,
            service_boiler_ssr_on: raw[1] & 0b0010 != 0,
            pump_on: raw[1] & 0b0100 != 0,
            service_boiler_solenoid_open: raw[1] & 0b1000 != 0,
        }
    }
}

// ── MockBoard ─────────────────────────────────────────────────

/// What the control board does on the next read.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Packet(ControlBoardPacket),
    /// Full frame that fails validation.
    Garbage,
    /// Nothing before the deadline.
    Silence,
}

pub fn reading(brew: f32, service: f32) -> ControlBoardPacket {
    ControlBoardPacket {
        brew_boiler_temperature: brew,
        service_boiler_temperature: service,
        ..ControlBoardPacket::default()
    }
}

pub struct MockBoard {
    now_us: u64,
    script: VecDeque<Reply>,
    /// Used once the script runs dry.
    pub steady: Reply,
    pub written: Vec<LccRawPacket>,
    pub reads: usize,
    pub clears: usize,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            now_us: 0,
            script: VecDeque::new(),
            steady: Reply::Silence,
            written: Vec::new(),
            reads: 0,
            clears: 0,
        }
    }

    pub fn push(&mut self, reply: Reply) {
        self.script.push_back(reply);
    }

    pub fn push_n(&mut self, reply: Reply, n: usize) {
        for _ in 0..n {
            self.push(reply);
        }
    }

    pub fn last_written(&self) -> Option<LccRawPacket> {
        self.written.last().copied()
    }
}

impl Transport for MockBoard {
    fn clear_input(&mut self) {
        self.clears += 1;
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let frame: LccRawPacket = bytes.try_into().map_err(|_| TransportError::Io)?;
        self.written.push(frame);
        Ok(())
    }

    fn read_exact_until(
        &mut self,
        buf: &mut [u8],
        deadline_us: u64,
    ) -> Result<(), TransportError> {
        self.reads += 1;
        let reply = self.script.pop_front().unwrap_or(self.steady);
        match reply {
            Reply::Silence => {
                self.now_us = self.now_us.max(deadline_us);
                Err(TransportError::Timeout)
            }
            Reply::Packet(p) => {
                self.now_us += REPLY_LATENCY_US;
                buf.copy_from_slice(&encode_control_board(&p));
                Ok(())
            }
            Reply::Garbage => {
                self.now_us += REPLY_LATENCY_US;
                buf.fill(0xAA);
                Ok(())
            }
        }
    }
}

impl Clock for MockBoard {
    fn now_us(&self) -> u64 {
        self.now_us
    }

    fn sleep_until(&mut self, deadline_us: u64) {
        self.now_us = self.now_us.max(deadline_us);
    }
}

// ── Queues ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCommands {
    pub frames: VecDeque<CommandFrame>,
}

impl CommandSource for MockCommands {
    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn remove(&mut self) -> Option<CommandFrame> {
        self.frames.pop_front()
    }
}

/// Bounded status queue; holds one snapshot like the firmware's.
pub struct MockStatus {
    pub capacity: usize,
    pub snapshots: VecDeque<StatusSnapshot>,
}

impl Default for MockStatus {
    fn default() -> Self {
        Self {
            capacity: 1,
            snapshots: VecDeque::new(),
        }
    }
}

impl StatusSink for MockStatus {
    fn is_full(&self) -> bool {
        self.snapshots.len() >= self.capacity
    }

    fn try_add(&mut self, snapshot: StatusSnapshot) -> Result<(), StatusSnapshot> {
        if self.is_full() {
            return Err(snapshot);
        }
        self.snapshots.push_back(snapshot);
        Ok(())
    }
}

// ── Storage + events ──────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub stored: Option<Settings>,
    pub saves: usize,
}

impl SettingsStore for MemStore {
    fn load(&mut self) -> Result<Settings, StorageError> {
        self.stored.ok_or(StorageError::NotFound)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.stored = Some(*settings);
        self.saves += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&ControllerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, ev: &ControllerEvent) -> bool {
        self.events.contains(ev)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(*event);
    }
}

// ── Recording boiler ──────────────────────────────────────────

/// One `control_signal` call: averaged temperature, feed-forward, forced
/// hysteresis.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCall {
    pub temperature: f32,
    pub feed_forward: Option<f32>,
    pub force_hysteresis: bool,
}

/// Boiler controller that remembers what it was asked and answers with a
/// fixed duty.
#[derive(Clone, Default)]
pub struct RecordingBoiler {
    pub calls: Rc<RefCell<Vec<ControlCall>>>,
    pub duty: u8,
    pub set_point: Rc<Cell<f32>>,
}

#[allow(dead_code)]
impl RecordingBoiler {
    pub fn with_duty(duty: u8) -> Self {
        Self {
            duty,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_call(&self) -> Option<ControlCall> {
        self.calls.borrow().last().copied()
    }
}

impl BoilerController for RecordingBoiler {
    fn control_signal(
        &mut self,
        temperature: f32,
        feed_forward: Option<f32>,
        force_hysteresis: bool,
    ) -> u8 {
        self.calls.borrow_mut().push(ControlCall {
            temperature,
            feed_forward,
            force_hysteresis,
        });
        self.duty
    }

    fn update_set_point(&mut self, target: f32) {
        self.set_point.set(target);
    }

    fn set_pid_parameters(&mut self, _settings: PidSettings) {}

    fn runtime_parameters(&self) -> PidRuntimeParameters {
        PidRuntimeParameters::default()
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// A controller wired to every mock port.
pub struct Rig<B = HybridController, S = HysteresisController> {
    pub ctl: SystemController<MockCodec, B, S>,
    pub codec: MockCodec,
    pub board: MockBoard,
    pub commands: MockCommands,
    pub status: MockStatus,
    pub store: MemStore,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with(ControllerConfig::default(), Settings::default())
    }

    pub fn with(config: ControllerConfig, settings: Settings) -> Self {
        let brew = HybridController::new(settings.brew_target, 10.0, settings.brew_pid, 1.0);
        let service = HysteresisController::new(settings.service_target, 1.0);
        Rig::with_boilers(config, settings, brew, service)
    }
}

#[allow(dead_code)]
impl<B: BoilerController, S: BoilerController> Rig<B, S> {
    pub fn with_boilers(config: ControllerConfig, settings: Settings, brew: B, service: S) -> Self {
        let codec = MockCodec::default();
        let ctl = SystemController::new(
            config,
            codec.clone(),
            brew,
            service,
            SystemSettings::new(settings),
        )
        .expect("valid config");
        Self {
            ctl,
            codec,
            board: MockBoard::new(),
            commands: MockCommands::default(),
            status: MockStatus::default(),
            store: MemStore::default(),
            sink: RecordingSink::default(),
        }
    }

    pub fn tick(&mut self) {
        self.ctl.tick(
            &mut self.board,
            &mut self.commands,
            &mut self.status,
            &mut self.store,
            &mut self.sink,
        );
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Queue one command for the next tick.
    pub fn command(&mut self, cmd: Command) {
        self.commands.frames.push_back(cmd.into());
    }

    /// `Begin`, consumed by one not-started tick.
    pub fn begin(&mut self) {
        self.command(Command::Begin);
        self.tick();
    }

    /// Begin, then settle in `Normal` with the board answering `steady`.
    pub fn running_with(&mut self, steady: ControlBoardPacket) {
        self.board.steady = Reply::Packet(steady);
        self.begin();
        self.tick();
    }

    pub fn now(&self) -> u64 {
        self.board.now_us()
    }

    /// Decoded frame most recently put on the wire.
    pub fn last_sent(&self) -> LccPacket {
        let raw = self.board.last_written().expect("something was sent");
        self.codec.decode_lcc(&raw)
    }

    /// Pop the queued snapshot so the next tick can publish.
    pub fn take_status(&mut self) -> Option<StatusSnapshot> {
        self.status.snapshots.pop_front()
    }
}
