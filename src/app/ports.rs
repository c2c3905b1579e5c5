//! Port traits — the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SystemController (domain)
//! ```
//!
//! The [`SystemController`](super::controller::SystemController) consumes
//! every port through generics, so the tick never touches a UART, a
//! timer or flash directly.  None of these operations may block except
//! [`Transport::read_exact_until`], which is bounded by its deadline.

use crate::app::commands::CommandFrame;
use crate::app::events::{ControllerEvent, StatusSnapshot};
use crate::app::settings::Settings;
use crate::control::{PidRuntimeParameters, PidSettings};
use crate::error::{PacketError, StorageError, TransportError};
use crate::protocol::{ControlBoardPacket, ControlBoardRawPacket, LccPacket, LccRawPacket};

// ───────────────────────────────────────────────────────────────
// Transport + clock (driven adapter: serial link ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Point-to-point serial link to the control board.
pub trait Transport {
    /// Discard any bytes already buffered on the receive side.
    fn clear_input(&mut self);

    /// Queue bytes for transmission.  Must not wait for the peer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Fill `buf` completely, giving up at `deadline_us` (monotonic)
    /// with [`TransportError::Timeout`].
    fn read_exact_until(&mut self, buf: &mut [u8], deadline_us: u64)
    -> Result<(), TransportError>;
}

/// Monotonic time source.
pub trait Clock {
    /// Microseconds since boot.
    fn now_us(&self) -> u64;

    /// Block until `deadline_us`; returns immediately if it has passed.
    fn sleep_until(&mut self, deadline_us: u64);
}

// ───────────────────────────────────────────────────────────────
// Packet codec (pure functions, owned by the protocol layer)
// ───────────────────────────────────────────────────────────────

/// Encoding, decoding and checksum validation for both directions.
pub trait PacketCodec {
    /// Validate and decode an inbound frame.
    fn parse_control_board(
        &self,
        raw: &ControlBoardRawPacket,
    ) -> Result<ControlBoardPacket, PacketError>;

    fn encode_lcc(&self, packet: &LccPacket) -> LccRawPacket;

    /// Self-check an outbound frame before it goes on the wire.
    fn validate_lcc(&self, raw: &LccRawPacket) -> Result<(), PacketError>;

    fn decode_lcc(&self, raw: &LccRawPacket) -> LccPacket;

    /// Encoded all-actuators-off frame.
    fn safe_packet(&self) -> LccRawPacket {
        self.encode_lcc(&LccPacket::default())
    }
}

// ───────────────────────────────────────────────────────────────
// Boiler controller (domain collaborator)
// ───────────────────────────────────────────────────────────────

/// A closed-loop heater controller producing on-slots out of 25.
pub trait BoilerController {
    /// Duty in `0..=25` for the next super-cycle.
    fn control_signal(
        &mut self,
        temperature: f32,
        feed_forward: Option<f32>,
        force_hysteresis: bool,
    ) -> u8;

    fn update_set_point(&mut self, target: f32);

    fn set_pid_parameters(&mut self, settings: PidSettings);

    /// Last computation, for status reporting only.
    fn runtime_parameters(&self) -> PidRuntimeParameters;
}

// ───────────────────────────────────────────────────────────────
// Inter-core queues
// ───────────────────────────────────────────────────────────────

/// Consumer half of the command queue.
pub trait CommandSource {
    fn is_empty(&self) -> bool;

    /// Take the oldest frame.  Callers check [`is_empty`](Self::is_empty)
    /// first.
    fn remove(&mut self) -> Option<CommandFrame>;
}

/// Producer half of the status queue.
pub trait StatusSink {
    fn is_full(&self) -> bool;

    /// Hand back the snapshot if the queue refused it.
    fn try_add(&mut self, snapshot: StatusSnapshot) -> Result<(), StatusSnapshot>;
}

// ───────────────────────────────────────────────────────────────
// Settings storage (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Persistent user settings.
pub trait SettingsStore {
    /// [`StorageError::NotFound`] on first boot.
    fn load(&mut self) -> Result<Settings, StorageError>;

    fn save(&mut self, settings: &Settings) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// Receives every [`ControllerEvent`].  Must not block.
pub trait EventSink {
    fn emit(&mut self, event: &ControllerEvent);
}
