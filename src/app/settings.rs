//! User settings and their persistence trigger.
//!
//! [`SystemSettings`] owns the live [`Settings`] value and remembers the
//! last value that reached flash.  [`SystemSettings::write_if_changed`]
//! runs once per tick and only touches the store when the two differ.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::ports::SettingsStore;
use crate::control::PidSettings;
use crate::error::StorageError;

/// Everything the user can change at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub brew_target: f32,
    pub service_target: f32,
    pub brew_pid: PidSettings,
    pub service_pid: PidSettings,
    pub eco_mode: bool,
    pub sleep_mode: bool,
    /// Idle minutes before automatic sleep; `0` disables.
    pub auto_sleep_minutes: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brew_target: 105.0,
            service_target: 125.0,
            brew_pid: PidSettings::default(),
            service_pid: PidSettings::default(),
            eco_mode: false,
            sleep_mode: false,
            auto_sleep_minutes: 0,
        }
    }
}

/// Live settings plus dirty tracking against the stored copy.
#[derive(Debug, Clone)]
pub struct SystemSettings {
    current: Settings,
    persisted: Option<Settings>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SystemSettings {
    /// Wrap a value that has not been stored yet.
    pub fn new(current: Settings) -> Self {
        Self {
            current,
            persisted: None,
        }
    }

    /// Load from the store, falling back to defaults.
    pub fn load(store: &mut impl SettingsStore) -> Self {
        match store.load() {
            Ok(settings) => {
                info!("Settings: loaded from store");
                Self {
                    current: settings,
                    persisted: Some(settings),
                }
            }
            Err(StorageError::NotFound) => {
                info!("Settings: nothing stored, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!("Settings: load failed ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn get(&self) -> &Settings {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.persisted != Some(self.current)
    }

    // ── Setters ───────────────────────────────────────────────

    pub fn set_brew_target(&mut self, target: f32) {
        self.current.brew_target = target;
    }

    pub fn set_service_target(&mut self, target: f32) {
        self.current.service_target = target;
    }

    pub fn set_brew_pid(&mut self, pid: PidSettings) {
        self.current.brew_pid = pid;
    }

    pub fn set_service_pid(&mut self, pid: PidSettings) {
        self.current.service_pid = pid;
    }

    pub fn set_eco_mode(&mut self, on: bool) {
        self.current.eco_mode = on;
    }

    pub fn set_sleep_mode(&mut self, on: bool) {
        self.current.sleep_mode = on;
    }

    pub fn set_auto_sleep_minutes(&mut self, minutes: u16) {
        self.current.auto_sleep_minutes = minutes;
    }

    // ── Persistence ───────────────────────────────────────────

    /// Persist the live value if it differs from the stored one.
    ///
    /// Returns `true` if a write happened.  Failures leave the settings
    /// dirty so the next tick retries.
    pub fn write_if_changed(&mut self, store: &mut impl SettingsStore) -> bool {
        if !self.is_dirty() {
            return false;
        }
        match store.save(&self.current) {
            Ok(()) => {
                self.persisted = Some(self.current);
                info!("Settings: saved");
                true
            }
            Err(e) => {
                warn!("Settings: save failed ({}), will retry", e);
                false
            }
        }
    }
}
