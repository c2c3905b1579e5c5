//! Bail / run-state machine.
//!
//! Two nested machines, both pure data:
//!
//! ```text
//!  Lifecycle                              RunState (while Running)
//!  ┌────────────┐ Begin                   ┌──────────────┐ T ≥ 65
//!  │ NotStarted │──────┐                  │ Undetermined │────────────┐
//!  └────────────┘      ▼                  └──────┬───────┘            │
//!               ┌─────────┐ timeout /            │ T < 65             │
//!     ┌────────▶│ Running │ bad inbound          ▼                    │
//!     │         └────┬────┘────────┐      ┌──────────────┐            │
//!     │ 2 s clean    │ bad outbound│      │ HeatupStage1 │            │
//!     │ or Unbail    │ / underrun  ▼      └──────┬───────┘            │
//!     │         ┌────▼──────┐ ┌────────────┐     │ T > 128            │
//!     ├─────────│ HardBailed│◀│ SoftBailed │     ▼                    │
//!     │ Unbail  └───────────┘ └─────┬──────┘ ┌──────────────┐ 4 min ┌─▼──────┐
//!     └─────────────────────────────┘        │ HeatupStage2 │──────▶│ Normal │
//!                                            └──────────────┘       └────────┘
//! ```
//!
//! [`transition`] maps `(state, event)` to `(state, effects)`; the
//! controller applies the effects (setpoint recompute, event emission).

pub mod policy;
pub mod transitions;

pub use policy::{SetPoints, at_set_point, coalesced_state, resolve_set_points};
pub use transitions::{Effect, Effects, MachineEvent, transition};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Lifecycle {
    NotStarted = 0,
    Running = 1,
    SoftBailed = 2,
    HardBailed = 3,
}

impl Lifecycle {
    pub fn is_bailed(self) -> bool {
        matches!(self, Self::SoftBailed | Self::HardBailed)
    }
}

/// Startup staging, meaningful only while [`Lifecycle::Running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunState {
    Undetermined = 0,
    HeatupStage1 = 1,
    HeatupStage2 = 2,
    Normal = 3,
}

impl RunState {
    pub fn is_heatup(self) -> bool {
        matches!(self, Self::HeatupStage1 | Self::HeatupStage2)
    }
}

/// Why the controller bailed.  `None` unless bailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BailReason {
    None = 0,
    ControlBoardUnresponsive = 1,
    ControlBoardPacketInvalid = 2,
    OutboundPacketInvalid = 3,
    SchedulerUnderrun = 4,
}

/// Externally visible summary of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CoalescedState {
    Undetermined = 0,
    Sleeping = 1,
    Heatup = 2,
    Warm = 3,
    Normalizing = 4,
    Bailed = 5,
}

// ---------------------------------------------------------------------------
// Machine state
// ---------------------------------------------------------------------------

/// Everything the transition function reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineState {
    pub lifecycle: Lifecycle,
    pub run_state: RunState,
    pub bail_reason: BailReason,
    /// First clean read of the current soft-bail recovery window.
    pub recovery_since: Option<u64>,
    /// Entry into heatup stage 2; disarmed while sleeping.
    pub heatup_stage2_since: Option<u64>,
    /// Transitions into a bailed lifecycle since boot.
    pub bail_count: u32,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineState {
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::NotStarted,
            run_state: RunState::Undetermined,
            bail_reason: BailReason::None,
            recovery_since: None,
            heatup_stage2_since: None,
            bail_count: 0,
        }
    }

    pub fn is_bailed(&self) -> bool {
        self.lifecycle.is_bailed()
    }

    /// Running and not bailed.
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }
}
