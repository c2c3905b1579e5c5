//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`SettingsStore`] as a single postcard blob under
//! `lcc/settings`.
//!
//! - **`target_os = "espidf"`** — raw `nvs_*` calls on the default
//!   partition.  Commits are atomic per `nvs_commit()`.
//! - **`not(target_os = "espidf")`** — in-memory blob for host tests.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::SettingsStore;
use crate::app::settings::Settings;
use crate::error::StorageError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Namespace and key, NUL-terminated for the C API.
#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"lcc\0";
#[cfg(target_os = "espidf")]
const SETTINGS_KEY: &[u8] = b"settings\0";

/// Anything larger is treated as corruption.
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsSettingsStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
    writes: u32,
}

impl NvsSettingsStore {
    /// Initialise NVS flash.  A full or version-mismatched partition is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the boot task before the control
            // loop touches NVS.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK
                {
                    return Err(StorageError::Io);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::Io);
            }
            info!("NvsSettingsStore: ESP-IDF NVS ready");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsSettingsStore: in-memory backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blob: None,
            writes: 0,
        })
    }

    /// Successful writes since construction.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, i32>,
    ) -> Result<T, i32> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Vec<u8>, StorageError> {
        let result = Self::with_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    SETTINGS_KEY.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    SETTINGS_KEY.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(buf) => Ok(buf),
            // Namespace missing on first boot reads as NOT_FOUND too.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(StorageError::Corrupted),
            Err(e) => {
                warn!("NVS: read error {}", e);
                Err(StorageError::Io)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Vec<u8>, StorageError> {
        match &self.blob {
            Some(b) if b.is_empty() || b.len() > MAX_BLOB_SIZE => Err(StorageError::Corrupted),
            Some(b) => Ok(b.clone()),
            None => Err(StorageError::NotFound),
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        Self::with_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    SETTINGS_KEY.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NVS: write error {}", e);
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                StorageError::Full
            } else {
                StorageError::Io
            }
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.blob = Some(bytes.to_vec());
        Ok(())
    }
}

impl SettingsStore for NvsSettingsStore {
    fn load(&mut self) -> Result<Settings, StorageError> {
        let bytes = self.read_blob()?;
        let settings: Settings =
            postcard::from_bytes(&bytes).map_err(|_| StorageError::Corrupted)?;
        info!("NvsSettingsStore: loaded {} bytes", bytes.len());
        Ok(settings)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(settings).map_err(|_| StorageError::Io)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }
        self.write_blob(&bytes)?;
        self.writes = self.writes.wrapping_add(1);
        Ok(())
    }
}
