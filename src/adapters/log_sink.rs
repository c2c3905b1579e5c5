//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! [`ControllerEvent`] to the `log` facade (UART / USB-CDC on the device).

use log::{error, info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;
use crate::fsm::BailReason;

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            ControllerEvent::Started => info!("LIFECYCLE | started"),
            ControllerEvent::Bailed {
                reason: BailReason::SchedulerUnderrun,
                ..
            } => error!("BAIL | hard | reason=SchedulerUnderrun (accounting bug)"),
            ControllerEvent::Bailed { reason, hard } => {
                warn!(
                    "BAIL | {} | reason={:?}",
                    if *hard { "hard" } else { "soft" },
                    reason
                );
            }
            ControllerEvent::Recovered => info!("BAIL | cleared | auto-recovery"),
            ControllerEvent::Unbailed => info!("BAIL | cleared | operator"),
            ControllerEvent::RunStateChanged { from, to } => {
                info!("RUN | {:?} -> {:?}", from, to);
            }
            ControllerEvent::BrewStarted { at_us } => info!("BREW | start | t={}us", at_us),
            ControllerEvent::BrewEnded { duration_ms } => {
                info!("BREW | end | {}.{:03}s", duration_ms / 1000, duration_ms % 1000);
            }
            ControllerEvent::SleepModeChanged { sleeping } => {
                info!("SLEEP | {}", if *sleeping { "enter" } else { "exit" });
            }
            ControllerEvent::AutoSleep => info!("SLEEP | auto"),
        }
    }
}
