//! WiFi station-mode adapter.
//!
//! Joins the network named in `wifi_config.json` so the TCP terminal is
//! reachable.  The controller never runs its own access point.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: the host's own network is used; `connect` only
//!   validates the credentials.
//!
//! ## Retry policy
//!
//! A failed join waits an exponential backoff (2 s → 4 s → 8 s … capped
//! at 60 s) before retrying, up to [`CONNECT_ATTEMPTS`] times.

use core::fmt;

use log::{info, warn};
use serde::Deserialize;

use crate::app::ports::{StorageError, StoragePort};

pub const WIFI_CONFIG_PATH: &str = "wifi_config.json";

pub const CONNECT_ATTEMPTS: u32 = 5;
const MAX_BACKOFF_SECS: u64 = 60;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    MalformedCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials stored"),
            Self::MalformedCredentials => write!(f, "{WIFI_CONFIG_PATH} is not a valid credentials document"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Contents of `wifi_config.json`: `{"ssid": "...", "password": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    #[serde(default)]
    pub password: heapless::String<64>,
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

impl WifiCredentials {
    pub fn parse(raw: &[u8]) -> Result<Self, ConnectivityError> {
        let creds: Self =
            serde_json::from_slice(raw).map_err(|_| ConnectivityError::MalformedCredentials)?;
        creds.validate()?;
        Ok(creds)
    }

    pub fn load(store: &dyn StoragePort) -> Result<Self, ConnectivityError> {
        match store.read(WIFI_CONFIG_PATH) {
            Ok(raw) => Self::parse(&raw),
            Err(StorageError::NotFound) => Err(ConnectivityError::NoCredentials),
            Err(e) => {
                warn!("WiFi: cannot read {WIFI_CONFIG_PATH}: {e}");
                Err(ConnectivityError::NoCredentials)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() || !is_printable_ascii(&self.ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        let pw = self.password.len();
        if pw != 0 && !(8..=64).contains(&pw) {
            return Err(ConnectivityError::InvalidPassword);
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Backoff before retry `attempt` (0-based).
pub fn backoff_secs(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt + 1).min(MAX_BACKOFF_SECS)
}

// ───────────────────────────────────────────────────────────────
// Station link
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod imp {
    use esp_idf_hal::modem::Modem;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{CONNECT_ATTEMPTS, ConnectivityError, WifiCredentials, backoff_secs};

    /// Joined station; dropping it leaves the network.
    pub struct WifiLink {
        wifi: BlockingWifi<EspWifi<'static>>,
    }

    impl WifiLink {
        pub fn connect(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: Option<EspDefaultNvsPartition>,
            creds: &WifiCredentials,
        ) -> Result<Self, ConnectivityError> {
            let fail = |e: esp_idf_sys::EspError| {
                warn!("WiFi: driver error: {e}");
                ConnectivityError::ConnectionFailed
            };
            let esp = EspWifi::new(modem, sysloop.clone(), nvs).map_err(fail)?;
            let mut wifi = BlockingWifi::wrap(esp, sysloop).map_err(fail)?;

            let config = ClientConfiguration {
                ssid: creds.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
                password: creds
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidPassword)?,
                auth_method: if creds.is_open() { AuthMethod::None } else { AuthMethod::WPA2Personal },
                ..Default::default()
            };
            wifi.set_configuration(&Configuration::Client(config)).map_err(fail)?;
            wifi.start().map_err(fail)?;

            for attempt in 0..CONNECT_ATTEMPTS {
                info!("WiFi: connecting to '{}' (attempt {})", creds.ssid, attempt + 1);
                match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                    Ok(()) => {
                        let link = Self { wifi };
                        info!("WiFi: connected, address {}", link.address().unwrap_or_default());
                        return Ok(link);
                    }
                    Err(e) => {
                        let wait = backoff_secs(attempt);
                        warn!("WiFi: join failed ({e}), retrying in {wait}s");
                        std::thread::sleep(std::time::Duration::from_secs(wait));
                    }
                }
            }
            Err(ConnectivityError::ConnectionFailed)
        }

        pub fn address(&self) -> Option<String> {
            self.wifi
                .wifi()
                .sta_netif()
                .get_ip_info()
                .ok()
                .map(|info| info.ip.to_string())
        }

        pub fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod imp {
    use log::info;

    use super::{ConnectivityError, WifiCredentials};

    /// Host stand-in: the OS network is already up.
    #[derive(Debug)]
    pub struct WifiLink {
        ssid: String,
    }

    impl WifiLink {
        pub fn connect(creds: &WifiCredentials) -> Result<Self, ConnectivityError> {
            creds.validate()?;
            info!("WiFi(sim): using host network in place of '{}'", creds.ssid);
            Ok(Self {
                ssid: creds.ssid.to_string(),
            })
        }

        pub fn address(&self) -> Option<String> {
            Some("0.0.0.0".into())
        }

        pub fn is_connected(&self) -> bool {
            !self.ssid.is_empty()
        }
    }
}

pub use imp::WifiLink;

/// Log the outcome of a join attempt the same way on every target.
pub fn report(result: &Result<WifiLink, ConnectivityError>) {
    match result {
        Ok(link) => info!(
            "WiFi: terminal reachable at {}",
            link.address().unwrap_or_else(|| "unknown address".into())
        ),
        Err(e) => warn!("WiFi: not connected ({e}); TCP terminal unreachable"),
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::Store;

    #[test]
    fn parses_wpa2_credentials() {
        let c = WifiCredentials::parse(br#"{"ssid":"HomeWiFi","password":"mysecret8"}"#).unwrap();
        assert_eq!(c.ssid.as_str(), "HomeWiFi");
        assert!(!c.is_open());
    }

    #[test]
    fn open_network_has_no_password() {
        let c = WifiCredentials::parse(br#"{"ssid":"OpenCafe"}"#).unwrap();
        assert!(c.is_open());
    }

    #[test]
    fn rejects_bad_credentials() {
        assert_eq!(
            WifiCredentials::parse(br#"{"ssid":"","password":"mysecret8"}"#),
            Err(ConnectivityError::InvalidSsid)
        );
        assert_eq!(
            WifiCredentials::parse(br#"{"ssid":"MyNet","password":"short"}"#),
            Err(ConnectivityError::InvalidPassword)
        );
        assert_eq!(
            WifiCredentials::parse(b"not json"),
            Err(ConnectivityError::MalformedCredentials)
        );
        // Longer than 32 bytes does not fit the SSID field.
        assert_eq!(
            WifiCredentials::parse(format!(r#"{{"ssid":"{}"}}"#, "x".repeat(33)).as_bytes()),
            Err(ConnectivityError::MalformedCredentials)
        );
    }

    #[test]
    fn missing_file_means_no_credentials() {
        let store = Store::default();
        assert_eq!(WifiCredentials::load(&store), Err(ConnectivityError::NoCredentials));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_secs(0), 2);
        assert_eq!(backoff_secs(1), 4);
        assert_eq!(backoff_secs(2), 8);
        assert_eq!(backoff_secs(10), 60);
    }

    #[test]
    fn host_link_accepts_valid_credentials() {
        let c = WifiCredentials::parse(br#"{"ssid":"HomeWiFi","password":"mysecret8"}"#).unwrap();
        let link = WifiLink::connect(&c);
        assert!(link.as_ref().is_ok_and(WifiLink::is_connected));
        report(&link);
    }
}
