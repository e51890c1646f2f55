//! NVS (Non-Volatile Storage) configuration adapter.
//!
//! Implements [`ConfigPort`]: the whole [`SystemConfig`] is one JSON blob
//! under `pumpbank::syscfg`.  A missing blob means "use defaults"; a blob
//! that does not parse or validate is an error, so a bad bench edit is
//! never silently replaced by the default pin map.
//!
//! - **`feature = "espidf"`**: ESP-IDF NVS flash, opened per call.
//! - otherwise: an in-memory map for host tests and simulation.

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::SystemConfig;
use crate::error::ConfigError;

#[cfg(not(feature = "espidf"))]
use std::collections::HashMap;

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(feature = "espidf")]
use log::warn;

const CONFIG_NAMESPACE: &str = "pumpbank";
const CONFIG_KEY: &str = "syscfg";

#[cfg_attr(not(feature = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsConfigStore {
    #[cfg(not(feature = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsConfigStore {
    /// Open the store, initialising NVS flash on target.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(feature = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::Storage("nvs_flash_erase failed"));
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::Storage("nvs_flash_init failed"));
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::Storage("nvs_flash_init failed"));
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(feature = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(feature = "espidf"))]
            store: HashMap::new(),
        })
    }

    #[cfg(not(feature = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Open the namespace, run `f` with the handle, then close it.
    #[cfg(feature = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let namespace = b"pumpbank\0";
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(namespace.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Raw stored blob, `None` when nothing has been saved.
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        #[cfg(not(feature = "espidf"))]
        {
            Ok(self.store.get(&Self::composite_key()).cloned())
        }

        #[cfg(feature = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let key = b"syscfg\0";
                let mut size: usize = 0;

                // First call: size only.
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
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
                        key.as_ptr() as *const _,
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
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
                Err(e) => {
                    warn!("NvsConfigStore: NVS read error {}", e);
                    Err(ConfigError::Storage("nvs read failed"))
                }
            }
        }
    }

    fn write_blob(&mut self, bytes: Vec<u8>) -> Result<(), ConfigError> {
        #[cfg(not(feature = "espidf"))]
        {
            self.store.insert(Self::composite_key(), bytes);
            Ok(())
        }

        #[cfg(feature = "espidf")]
        {
            if bytes.len() > MAX_BLOB_SIZE {
                return Err(ConfigError::Storage("config blob too large"));
            }
            let result = Self::with_nvs_handle(true, |handle| {
                let key = b"syscfg\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
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
            });
            result.map_err(|e| {
                warn!("NvsConfigStore: NVS write error {}", e);
                ConfigError::Storage("nvs write failed")
            })
        }
    }
}

impl ConfigPort for NvsConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match self.read_blob()? {
            Some(bytes) => {
                let text = core::str::from_utf8(&bytes)
                    .map_err(|_| ConfigError::Parse("stored config is not UTF-8".into()))?;
                let config = SystemConfig::from_json(text)?;
                info!("NvsConfigStore: loaded config ({} bytes)", bytes.len());
                Ok(config)
            }
            None => {
                info!("NvsConfigStore: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = serde_json::to_vec(config).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let len = bytes.len();
        self.write_blob(bytes)?;
        info!("NvsConfigStore: config saved ({} bytes)", len);
        Ok(())
    }
}
