//! Configuration
//!
//! Two layers:
//!
//! - The **configuration document**: the JSON object describing the
//!   watering system name and its domains.  It arrives as raw text (boot
//!   file or `update_config`), is validated here into a [`ConfigDocument`],
//!   and the raw text is kept verbatim by the service for `print_config`.
//! - The **runtime settings** ([`ControllerSettings`]): port numbers,
//!   poll interval, duration cap and friends.  Loaded from
//!   `settings.json` when present, defaults otherwise.
//!
//! ```text
//!   raw text ──▶ serde_json::Value ──▶ validate ──▶ ConfigDocument
//!                                          │
//!                                          └──▶ ConfigError (first offending field)
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::{ConfigError, SettingsError};
use crate::schedule::ScheduleTable;

/// Where runtime settings live in storage.
pub const SETTINGS_PATH: &str = "settings.json";

/// Longest run a single watering may take, manual or scheduled.  A run
/// blocks its domain for its whole length.
pub const MAX_RUN_SECS: f32 = 60.0;

/// `true` if `name` is non-empty and uses only `[A-Za-z0-9_-]`.
///
/// Shared by document validation and the `water` command so every
/// configured domain is addressable from a terminal.
pub fn is_valid_domain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// ═══════════════════════════════════════════════════════════════
//  Configuration document
// ═══════════════════════════════════════════════════════════════

/// One domain as described by a validated document.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSpec {
    pub name: String,
    pub actuator_id: u8,
    pub duration_secs: f32,
    /// `None` = manual only.
    pub schedule: Option<ScheduleTable>,
}

/// A configuration document that passed full validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub name: String,
    /// Document order.
    pub domains: Vec<DomainSpec>,
}

impl ConfigDocument {
    /// Parse and validate `raw`.  All-or-nothing: the first problem found
    /// rejects the whole document.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let Value::Object(root) = root else {
            return Err(ConfigError::Parse("top level is not an object".into()));
        };

        let name = require_str(&root, "name", "name")?;
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let list = match root.get("domains") {
            None => return Err(ConfigError::MissingField("domains".into())),
            Some(Value::Array(list)) => list,
            Some(_) => {
                return Err(ConfigError::WrongType {
                    field: "domains".into(),
                    expected: "an array",
                });
            }
        };

        let mut domains: Vec<DomainSpec> = Vec::with_capacity(list.len());
        for (i, entry) in list.iter().enumerate() {
            let spec = parse_domain(i, entry)?;
            if domains.iter().any(|d| d.name == spec.name) {
                return Err(ConfigError::DuplicateDomain(spec.name));
            }
            // Each domain serialises its own runs; two sharing a relay would not.
            if domains.iter().any(|d| d.actuator_id == spec.actuator_id) {
                return Err(ConfigError::DuplicateActuator {
                    domain: spec.name,
                    gpio: spec.actuator_id,
                });
            }
            domains.push(spec);
        }

        Ok(Self {
            name: name.to_string(),
            domains,
        })
    }
}

fn parse_domain(index: usize, entry: &Value) -> Result<DomainSpec, ConfigError> {
    let path = format!("domains[{index}]");
    let Value::Object(obj) = entry else {
        return Err(ConfigError::WrongType {
            field: path,
            expected: "an object",
        });
    };

    let name = require_str(obj, "name", &format!("{path}.name"))?;
    if !is_valid_domain_name(name) {
        return Err(ConfigError::InvalidDomainName(name.to_string()));
    }

    let actuator_id = match obj.get("gpio") {
        None => return Err(ConfigError::MissingField(format!("{path}.gpio"))),
        Some(v) => v
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ConfigError::InvalidActuator {
                domain: name.to_string(),
            })?,
    };

    let duration = match obj.get("duration") {
        None => return Err(ConfigError::MissingField(format!("{path}.duration"))),
        Some(v) => v.as_f64().ok_or_else(|| ConfigError::WrongType {
            field: format!("{path}.duration"),
            expected: "a number",
        })?,
    };
    let duration_secs = duration as f32;
    if !(duration_secs.is_finite() && duration_secs > 0.0 && duration_secs <= MAX_RUN_SECS) {
        return Err(ConfigError::InvalidDuration {
            domain: name.to_string(),
            value: duration,
        });
    }

    let schedule = match obj.get("schedule") {
        None | Some(Value::Null) => None,
        Some(Value::Array(entries)) => {
            let table = parse_schedule(name, &format!("{path}.schedule"), entries)?;
            // An empty list behaves like no schedule at all.
            (!table.is_empty()).then_some(table)
        }
        Some(_) => {
            return Err(ConfigError::WrongType {
                field: format!("{path}.schedule"),
                expected: "an array",
            });
        }
    };

    Ok(DomainSpec {
        name: name.to_string(),
        actuator_id,
        duration_secs,
        schedule,
    })
}

fn parse_schedule(domain: &str, path: &str, entries: &[Value]) -> Result<ScheduleTable, ConfigError> {
    // Check shapes first so the table builder only sees strings.
    let mut rows: Vec<(&str, Vec<&str>)> = Vec::with_capacity(entries.len());
    for (j, entry) in entries.iter().enumerate() {
        let at = format!("{path}[{j}]");
        let Value::Object(obj) = entry else {
            return Err(ConfigError::WrongType {
                field: at,
                expected: "an object",
            });
        };
        let weekday = require_str(obj, "weekday", &format!("{at}.weekday"))?;
        let times = match obj.get("times") {
            None => return Err(ConfigError::MissingField(format!("{at}.times"))),
            Some(Value::Array(times)) => times,
            Some(_) => {
                return Err(ConfigError::WrongType {
                    field: format!("{at}.times"),
                    expected: "an array",
                });
            }
        };
        let mut texts = Vec::with_capacity(times.len());
        for (k, t) in times.iter().enumerate() {
            let text = t.as_str().ok_or_else(|| ConfigError::WrongType {
                field: format!("{at}.times[{k}]"),
                expected: "a string",
            })?;
            texts.push(text);
        }
        rows.push((weekday, texts));
    }
    ScheduleTable::from_entries(domain, rows)
}

fn require_str<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str, ConfigError> {
    match obj.get(key) {
        None => Err(ConfigError::MissingField(path.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ConfigError::WrongType {
            field: path.to_string(),
            expected: "a string",
        }),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Runtime settings
// ═══════════════════════════════════════════════════════════════

/// Controller tunables.  Missing keys in `settings.json` take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Where the configuration document is persisted.
    pub config_path: String,
    /// TCP command terminal port.
    pub tcp_port: u16,
    /// Schedule poll interval (seconds).  Must stay well under a minute.
    pub poll_interval_secs: u32,
    /// Upper bound for `water <name> <duration>`.
    pub max_manual_duration_secs: f32,
    /// Entries kept in the watering history.
    pub history_capacity: usize,
    /// How often the clock snapshot is written (seconds).
    pub clock_save_interval_secs: u32,
    /// Serial terminal baud rate.
    pub uart_baud: u32,
    /// Reported in the session banner.
    pub firmware_version: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            config_path: "config.json".into(),
            tcp_port: 31415,
            poll_interval_secs: 5,
            max_manual_duration_secs: 60.0,
            history_capacity: 10,
            clock_save_interval_secs: 300, // 5 min
            uart_baud: 9600,
            firmware_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl ControllerSettings {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.config_path.is_empty() {
            return Err(SettingsError("config_path must not be empty"));
        }
        if self.tcp_port == 0 {
            return Err(SettingsError("tcp_port must be non-zero"));
        }
        if !(1..=30).contains(&self.poll_interval_secs) {
            return Err(SettingsError("poll_interval_secs must be 1-30"));
        }
        let max = self.max_manual_duration_secs;
        if !(max.is_finite() && max > 0.0 && max <= MAX_RUN_SECS) {
            return Err(SettingsError("max_manual_duration_secs must be in (0, 60]"));
        }
        if !(1..=100).contains(&self.history_capacity) {
            return Err(SettingsError("history_capacity must be 1-100"));
        }
        if self.clock_save_interval_secs == 0 {
            return Err(SettingsError("clock_save_interval_secs must be > 0"));
        }
        if self.uart_baud == 0 {
            return Err(SettingsError("uart_baud must be > 0"));
        }
        Ok(())
    }

    /// Load from [`SETTINGS_PATH`].  Absent, unreadable or invalid
    /// settings fall back to defaults with a warning.
    pub fn load_or_default(store: &dyn StoragePort) -> Self {
        let bytes = match store.read(SETTINGS_PATH) {
            Ok(b) => b,
            Err(StorageError::NotFound) => return Self::default(),
            Err(e) => {
                warn!("Settings: read failed ({e}), using defaults");
                return Self::default();
            }
        };
        let settings: Self = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!("Settings: {SETTINGS_PATH} unparsable ({e}), using defaults");
                return Self::default();
            }
        };
        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Settings: {e}, using defaults");
                Self::default()
            }
        }
    }
}
