//! Power-sharing duty scheduler.
//!
//! The two boiler heaters share one power budget.  Once per super-cycle
//! the controller turns the two duty requests into a schedule of
//! [`SUPER_CYCLE_SLOTS`] mutually exclusive slots; one slot is consumed
//! per tick.
//!
//! ```text
//!  requests (b, s) ──▶ share_power() ──▶ grant (b', s', n)
//!                                            │
//!                                            ▼
//!  ┌──────────────────────── 25 slots ─────────────────────────┐
//!  │ BrewOn × b'      │ ServiceOn × s'        │ NeitherOn × n  │
//!  └───────────────────────────────────────────────────────────┘
//!                 next_slot() pops one per 100 ms tick
//! ```

use heapless::Deque;
use serde::Serialize;

pub use crate::config::SUPER_CYCLE_SLOTS;

const BUDGET: u8 = SUPER_CYCLE_SLOTS as u8;

// ═══════════════════════════════════════════════════════════════
//  Slot and duty types
// ═══════════════════════════════════════════════════════════════

/// Heater state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotState {
    BrewOn,
    ServiceOn,
    NeitherOn,
}

impl SlotState {
    pub fn brew_ssr_on(self) -> bool {
        self == Self::BrewOn
    }

    pub fn service_ssr_on(self) -> bool {
        self == Self::ServiceOn
    }
}

/// Raw on-slot requests from the two boiler controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyRequest {
    pub brew: u8,
    pub service: u8,
}

/// Slots actually granted for one super-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyGrant {
    pub brew: u8,
    pub service: u8,
}

impl DutyGrant {
    /// Slots with both heaters off.
    pub fn neither(&self) -> u8 {
        BUDGET.saturating_sub(self.brew.saturating_add(self.service))
    }
}

/// Fit two requests into the budget.
///
/// Requests are clamped to the budget first.  If they fit, both are
/// granted unchanged.  On overflow a brewing brew boiler keeps its whole
/// request and the service boiler gets what is left; otherwise the brew
/// boiler is cut to `floor(brew * idle_brew_share)` and the service
/// boiler takes the rest of the budget.
pub fn share_power(request: DutyRequest, brewing: bool, idle_brew_share: f32) -> DutyGrant {
    let brew = request.brew.min(BUDGET);
    let service = request.service.min(BUDGET);

    if brew + service <= BUDGET {
        return DutyGrant { brew, service };
    }

    let brew = if brewing {
        brew
    } else {
        ((f32::from(brew) * idle_brew_share).floor() as u8).min(BUDGET)
    };

    DutyGrant {
        brew,
        service: BUDGET - brew,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Queue of slots for the current super-cycle.
pub struct DutyScheduler {
    slots: Deque<SlotState, SUPER_CYCLE_SLOTS>,
    /// Refills queue nothing, so the empty-schedule path can be reached.
    #[cfg(test)]
    starved: bool,
}

impl Default for DutyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DutyScheduler {
    pub fn new() -> Self {
        Self {
            slots: Deque::new(),
            #[cfg(test)]
            starved: false,
        }
    }

    /// True once every slot of the previous super-cycle was consumed.
    pub fn needs_refill(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots left in the current super-cycle.
    pub fn remaining(&self) -> usize {
        self.slots.len()
    }

    /// Replace the schedule with three contiguous blocks: brew, service,
    /// neither.  Returns the number of slots queued.
    pub fn refill(&mut self, grant: DutyGrant) -> usize {
        self.slots.clear();
        #[cfg(test)]
        {
            if self.starved {
                return 0;
            }
        }
        let blocks = [
            (SlotState::BrewOn, grant.brew),
            (SlotState::ServiceOn, grant.service),
            (SlotState::NeitherOn, grant.neither()),
        ];
        for (state, count) in blocks {
            for _ in 0..count {
                if self.slots.push_back(state).is_err() {
                    return self.slots.len();
                }
            }
        }
        self.slots.len()
    }

    /// Consume this tick's slot.  `None` means the schedule ran dry.
    pub fn next_slot(&mut self) -> Option<SlotState> {
        self.slots.pop_front()
    }

    /// Drop the current schedule and make every later refill come up empty.
    #[cfg(test)]
    pub(crate) fn starve(&mut self) {
        self.starved = true;
        self.slots.clear();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
