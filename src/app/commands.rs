//! Inbound commands from the companion core.
//!
//! The queue carries fixed-shape [`CommandFrame`]s (a kind byte, five
//! float payloads and one bool).  The controller converts each frame into
//! a typed [`Command`] before acting on it.

use serde::{Deserialize, Serialize};

use crate::control::PidSettings;
use crate::error::PacketError;

/// Wire discriminants for [`CommandFrame::kind`].
pub mod kind {
    pub const SET_BREW_SET_POINT: u8 = 0;
    pub const SET_BREW_PID_PARAMETERS: u8 = 1;
    pub const SET_SERVICE_SET_POINT: u8 = 2;
    pub const SET_SERVICE_PID_PARAMETERS: u8 = 3;
    pub const SET_ECO_MODE: u8 = 4;
    pub const SET_SLEEP_MODE: u8 = 5;
    pub const UNBAIL: u8 = 6;
    pub const TRIGGER_FIRST_RUN: u8 = 7;
    pub const BEGIN: u8 = 8;
    pub const SET_AUTO_SLEEP_MINUTES: u8 = 9;
}

/// Commands the controller understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetBrewSetPoint(f32),
    SetBrewPidParameters(PidSettings),
    SetServiceSetPoint(f32),
    SetServicePidParameters(PidSettings),
    SetEcoMode(bool),
    SetSleepMode(bool),
    /// Idle minutes before automatic sleep; `0` disables.
    SetAutoSleepMinutes(u16),
    /// Clear a soft or hard bail.
    Unbail,
    /// Lifecycle marker from the companion; no effect here.
    TriggerFirstRun,
    /// Leave `NotStarted`.
    Begin,
}

/// Queue element as produced by the companion core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub kind: u8,
    pub float1: f32,
    pub float2: f32,
    pub float3: f32,
    pub float4: f32,
    pub float5: f32,
    pub bool1: bool,
}

impl CommandFrame {
    fn pid_settings(&self) -> PidSettings {
        PidSettings {
            kp: self.float1,
            ki: self.float2,
            kd: self.float3,
            windup_low: self.float4,
            windup_high: self.float5,
        }
    }

    /// PID payload, rejected unless every gain and windup bound is finite.
    fn finite_pid_settings(&self) -> Result<PidSettings, PacketError> {
        let pid = self.pid_settings();
        if pid.is_finite() {
            Ok(pid)
        } else {
            Err(PacketError::Invalid(u16::from(self.kind)))
        }
    }

    fn finite_float1(&self) -> Result<f32, PacketError> {
        if self.float1.is_finite() {
            Ok(self.float1)
        } else {
            Err(PacketError::Invalid(u16::from(self.kind)))
        }
    }

    fn with_pid(kind: u8, pid: PidSettings) -> Self {
        Self {
            kind,
            float1: pid.kp,
            float2: pid.ki,
            float3: pid.kd,
            float4: pid.windup_low,
            float5: pid.windup_high,
            ..Self::default()
        }
    }
}

impl TryFrom<CommandFrame> for Command {
    type Error = PacketError;

    fn try_from(frame: CommandFrame) -> Result<Self, Self::Error> {
        Ok(match frame.kind {
            kind::SET_BREW_SET_POINT => Self::SetBrewSetPoint(frame.finite_float1()?),
            kind::SET_BREW_PID_PARAMETERS => {
                Self::SetBrewPidParameters(frame.finite_pid_settings()?)
            }
            kind::SET_SERVICE_SET_POINT => Self::SetServiceSetPoint(frame.finite_float1()?),
            kind::SET_SERVICE_PID_PARAMETERS => {
                Self::SetServicePidParameters(frame.finite_pid_settings()?)
            }
            kind::SET_ECO_MODE => Self::SetEcoMode(frame.bool1),
            kind::SET_SLEEP_MODE => Self::SetSleepMode(frame.bool1),
            kind::SET_AUTO_SLEEP_MINUTES => {
                let minutes = frame.float1;
                if !minutes.is_finite() || minutes < 0.0 {
                    return Err(PacketError::Invalid(u16::from(frame.kind)));
                }
                Self::SetAutoSleepMinutes(minutes.min(f32::from(u16::MAX)) as u16)
            }
            kind::UNBAIL => Self::Unbail,
            kind::TRIGGER_FIRST_RUN => Self::TriggerFirstRun,
            kind::BEGIN => Self::Begin,
            other => return Err(PacketError::UnknownCommand(other)),
        })
    }
}

impl From<Command> for CommandFrame {
    fn from(cmd: Command) -> Self {
        let base = Self::default();
        match cmd {
            Command::SetBrewSetPoint(t) => Self {
                kind: kind::SET_BREW_SET_POINT,
                float1: t,
                ..base
            },
            Command::SetBrewPidParameters(p) => Self::with_pid(kind::SET_BREW_PID_PARAMETERS, p),
            Command::SetServiceSetPoint(t) => Self {
                kind: kind::SET_SERVICE_SET_POINT,
                float1: t,
                ..base
            },
            Command::SetServicePidParameters(p) => {
                Self::with_pid(kind::SET_SERVICE_PID_PARAMETERS, p)
            }
            Command::SetEcoMode(on) => Self {
                kind: kind::SET_ECO_MODE,
                bool1: on,
                ..base
            },
            Command::SetSleepMode(on) => Self {
                kind: kind::SET_SLEEP_MODE,
                bool1: on,
                ..base
            },
            Command::SetAutoSleepMinutes(m) => Self {
                kind: kind::SET_AUTO_SLEEP_MINUTES,
                float1: f32::from(m),
                ..base
            },
            Command::Unbail => Self {
                kind: kind::UNBAIL,
                ..base
            },
            Command::TriggerFirstRun => Self {
                kind: kind::TRIGGER_FIRST_RUN,
                ..base
            },
            Command::Begin => Self {
                kind: kind::BEGIN,
                ..base
            },
        }
    }
}
