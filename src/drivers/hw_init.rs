//! One-shot hardware initialization.
//!
//! Mounts the flash filesystem and configures relay GPIOs using raw
//! ESP-IDF sys calls.  On the host every call is a logged no-op and
//! relay levels are kept in a simulated register.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    /// The pin has no output driver or is reserved.
    PinNotUsable(u8),
    GpioConfigFailed(i32),
    StorageMountFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PinNotUsable(g)        => write!(f, "GPIO {} cannot drive a relay", g),
            Self::GpioConfigFailed(rc)   => write!(f, "GPIO config failed (rc={})", rc),
            Self::StorageMountFailed(rc) => write!(f, "SPIFFS mount failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── Flash filesystem ──────────────────────────────────────────

/// Mount SPIFFS at [`crate::adapters::storage::FLASH_ROOT`], formatting
/// the partition if it has never been used.
#[cfg(target_os = "espidf")]
pub fn mount_storage() -> Result<(), HwInitError> {
    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    // SAFETY: called once from main() before any file access; `conf`
    // and the literal it points to outlive the call.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK {
        return Err(HwInitError::StorageMountFailed(ret));
    }
    info!("hw_init: SPIFFS mounted at /spiffs");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn mount_storage() -> Result<(), HwInitError> {
    info!("hw_init(sim): flash mount skipped");
    Ok(())
}

// ── GPIO outputs ──────────────────────────────────────────────

/// Configure `gpio` as a push-pull output driven low.
#[cfg(target_os = "espidf")]
pub fn configure_output(gpio: u8) -> Result<(), HwInitError> {
    if !pins::is_relay_capable(gpio) {
        return Err(HwInitError::PinNotUsable(gpio));
    }
    let pin = i32::from(gpio);
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pin named in the mask, which
    // was checked above.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // SAFETY: pin was configured as an output just above.
    unsafe { gpio_set_level(pin, 0) };
    info!("hw_init: GPIO {} configured as relay output", gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_output(gpio: u8) -> Result<(), HwInitError> {
    if !pins::is_relay_capable(gpio) {
        return Err(HwInitError::PinNotUsable(gpio));
    }
    sim::write(gpio, false);
    info!("hw_init(sim): GPIO {} configured as relay output", gpio);
    Ok(())
}

/// Drive a configured output.  Returns the raw driver status on failure.
#[cfg(target_os = "espidf")]
pub fn gpio_write(gpio: u8, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level writes one already-configured output pin.
    let ret = unsafe { gpio_set_level(i32::from(gpio), u32::from(high)) };
    if ret == ESP_OK { Ok(()) } else { Err(ret) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(gpio: u8, high: bool) -> Result<(), i32> {
    sim::write(gpio, high);
    Ok(())
}

/// Simulated output levels on the host.
#[cfg(not(target_os = "espidf"))]
pub fn sim_level(gpio: u8) -> bool {
    sim::read(gpio)
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::atomic::{AtomicU64, Ordering};

    static LEVELS: AtomicU64 = AtomicU64::new(0);

    pub fn write(gpio: u8, high: bool) {
        let bit = 1u64 << (gpio & 63);
        if high {
            LEVELS.fetch_or(bit, Ordering::AcqRel);
        } else {
            LEVELS.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    pub fn read(gpio: u8) -> bool {
        LEVELS.load(Ordering::Acquire) & (1u64 << (gpio & 63)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_pins_are_refused() {
        assert_eq!(configure_output(4), Err(HwInitError::PinNotUsable(4)));
        assert_eq!(configure_output(36), Err(HwInitError::PinNotUsable(36)));
    }

    #[test]
    fn sim_register_tracks_levels() {
        configure_output(27).unwrap();
        gpio_write(27, true).unwrap();
        assert!(sim_level(27));
        gpio_write(27, false).unwrap();
        assert!(!sim_level(27));
    }
}
