//! Water-path supervisor.
//!
//! Runs every non-bailed tick on the freshly parsed inbound packet and
//! decides the pump and service-solenoid outputs.
//!
//! ## Rules
//!
//! 1. The water-tank-empty and service-boiler-low flags are debounced
//!    through [`TimedLatch`]es before use.
//! 2. A brew only *starts* when the brew switch is on and the tank is
//!    not latched empty.
//! 3. A brew in progress continues while the switch stays on, even if
//!    the tank reads empty later.  It ends when the switch releases.
//! 4. With no brew in progress and water in the tank, a latched
//!    service-low flag opens the solenoid and runs the pump (refill).
//!    A brew start always wins over a refill.

use crate::config::ControllerConfig;
use crate::filters::TimedLatch;
use crate::protocol::ControlBoardPacket;

/// Brew edge detected this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrewEdge {
    Started,
    /// Carries the instant the brew began.
    Ended { started_at: u64 },
}

/// Water-path outputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowDecision {
    pub pump_on: bool,
    pub solenoid_open: bool,
    pub brewing: bool,
    pub edge: Option<BrewEdge>,
}

/// Water-path supervisor.
pub struct FlowSupervisor {
    water_tank_empty: TimedLatch,
    service_boiler_low: TimedLatch,
    /// Set while a brew is in progress.
    brew_started_at: Option<u64>,
}

impl FlowSupervisor {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            water_tank_empty: TimedLatch::new(config.water_tank_latch_ms, false),
            service_boiler_low: TimedLatch::new(config.service_low_latch_ms, false),
            brew_started_at: None,
        }
    }

    /// Feed the latest inbound packet and decide the water path.
    pub fn evaluate(&mut self, packet: &ControlBoardPacket, now_us: u64) -> FlowDecision {
        self.water_tank_empty.set(packet.water_tank_empty, now_us);
        self.service_boiler_low.set(packet.service_boiler_low, now_us);

        let mut out = FlowDecision::default();

        match self.brew_started_at {
            None => {
                if self.water_tank_empty.get() {
                    // No water: neither brew nor refill may start.
                } else if packet.brew_switch {
                    out.pump_on = true;
                    out.brewing = true;
                    out.edge = Some(BrewEdge::Started);
                    self.brew_started_at = Some(now_us);
                } else if self.service_boiler_low.get() {
                    out.pump_on = true;
                    out.solenoid_open = true;
                }
            }
            Some(started_at) => {
                if packet.brew_switch {
                    out.pump_on = true;
                    out.brewing = true;
                } else {
                    out.edge = Some(BrewEdge::Ended { started_at });
                    self.brew_started_at = None;
                }
            }
        }

        out
    }

    /// Milliseconds since the current brew began.
    pub fn brew_elapsed_ms(&self, now_us: u64) -> Option<u64> {
        self.brew_started_at
            .map(|start| now_us.saturating_sub(start) / 1000)
    }

    pub fn brew_started_at(&self) -> Option<u64> {
        self.brew_started_at
    }

    /// Debounced water-tank-empty flag.
    pub fn water_tank_empty(&self) -> bool {
        self.water_tank_empty.get()
    }

    /// Debounced service-boiler-low flag.
    pub fn service_boiler_low(&self) -> bool {
        self.service_boiler_low.get()
    }
}
