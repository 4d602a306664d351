//! ESP-IDF 外设适配：NVS、按钮、指示灯、MAC 地址与重启

use esp_idf_svc::{
    hal::gpio::{Input, Output, Pin, PinDriver},
    nvs::EspDefaultNvs,
    sys::EspError,
};

use crate::captive_portal::Restart;
use crate::schema::FieldDescriptor;
use crate::storage::FieldStorage;
use crate::trigger::{Heartbeat, TriggerInput};

/// Field values kept as NVS strings, one key per schema index.
pub struct NvsStorage {
    nvs: EspDefaultNvs,
}

impl NvsStorage {
    pub fn new(nvs: EspDefaultNvs) -> Self {
        Self { nvs }
    }

    fn key(index: usize) -> String {
        format!("f{index}")
    }
}

impl FieldStorage for NvsStorage {
    type Error = EspError;

    fn load(
        &mut self,
        index: usize,
        _field: &FieldDescriptor,
    ) -> Result<Option<String>, Self::Error> {
        let key = Self::key(index);
        let Some(len) = self.nvs.str_len(&key)? else {
            return Ok(None);
        };
        let mut buf = vec![0u8; len + 1];
        Ok(self.nvs.get_str(&key, &mut buf)?.map(str::to_string))
    }

    fn store(
        &mut self,
        index: usize,
        _field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), Self::Error> {
        self.nvs.set_str(&Self::key(index), value)
    }
}

impl<T: Pin> TriggerInput for PinDriver<'_, T, Input> {
    fn is_high(&mut self) -> bool {
        PinDriver::is_high(self)
    }
}

impl<T: Pin> Heartbeat for PinDriver<'_, T, Output> {
    fn toggle(&mut self) {
        if let Err(e) = PinDriver::toggle(self) {
            log::warn!("failed to toggle heartbeat LED: {:?}", e);
        }
    }
}

/// WiFi STA MAC 地址
pub fn read_mac() -> [u8; 6] {
    let mut mac = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_read_mac(
            mac.as_mut_ptr(),
            esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_WIFI_STA,
        );
    }
    mac
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EspRestart;

impl Restart for EspRestart {
    fn restart(&mut self) -> ! {
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}

pub fn log_heap() {
    unsafe {
        use esp_idf_svc::sys::{heap_caps_get_free_size, MALLOC_CAP_INTERNAL};

        log::info!(
            "Free INTERNAL heap size: {}KB",
            heap_caps_get_free_size(MALLOC_CAP_INTERNAL) / 1024
        );
    }
}
