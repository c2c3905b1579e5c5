//! Packet shapes exchanged with the control board.
//!
//! Only the parsed, logical view lives here.  Byte layout, encoding and
//! checksums belong to the [`PacketCodec`](crate::app::ports::PacketCodec)
//! port; the controller sees raw packets as opaque fixed-size buffers.
//!
//! ```text
//!   LCC ──[LccRawPacket, 5 B]──────────▶ control board
//!   LCC ◀──[ControlBoardRawPacket, 18 B]── control board     every 100 ms
//! ```

use serde::{Deserialize, Serialize};

/// Size of one inbound frame from the control board.
pub const CONTROL_BOARD_PACKET_LEN: usize = 18;

/// Size of one outbound frame to the control board.
pub const LCC_PACKET_LEN: usize = 5;

pub type ControlBoardRawPacket = [u8; CONTROL_BOARD_PACKET_LEN];
pub type LccRawPacket = [u8; LCC_PACKET_LEN];

/// Inbound readings, as decoded by the codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlBoardPacket {
    pub brew_switch: bool,
    pub water_tank_empty: bool,
    pub service_boiler_low: bool,
    pub brew_boiler_temperature: f32,
    pub service_boiler_temperature: f32,
}

/// Outbound actuator commands.
///
/// `Default` is the all-off packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LccPacket {
    pub brew_boiler_ssr_on: bool,
    pub service_boiler_ssr_on: bool,
    pub pump_on: bool,
    pub service_boiler_solenoid_open: bool,
}

impl LccPacket {
    pub fn any_actuator_on(&self) -> bool {
        self.brew_boiler_ssr_on
            || self.service_boiler_ssr_on
            || self.pump_on
            || self.service_boiler_solenoid_open
    }
}
