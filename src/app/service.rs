//! Watering system: the hexagonal core.
//!
//! [`WateringSystem`] owns the live domain set and the configuration
//! document it was built from.  It is created once at boot, wrapped in an
//! `Arc`, and shared by the scheduler thread and every terminal session.
//! All I/O flows through the port traits in [`SystemPorts`].
//!
//! ```text
//!   ClockPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │      WateringSystem       │
//! ActuatorPort ◀──│  domains · document · path│ ◀──▶ StoragePort
//!                 └──────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! Three levels, always taken in this order:
//!
//! 1. `reload`: one configuration swap at a time (load → validate →
//!    persist → swap).
//! 2. `state`: read lock to look domains up or claim scheduled minutes;
//!    write lock only for the swap itself.  Never held while watering.
//! 3. Per-domain run lock inside [`Domain::water`].
//!
//! `domains` and `document` change together under one write lock, so a
//! reader always sees a consistent pair.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use super::domain::{Domain, Watered};
use super::events::{AppEvent, FireSource};
use super::ports::{
    ActuatorPort, ClockError, ClockPort, EventSink, FireDelegate, ScheduledRun, StoragePort,
};
use crate::config::ConfigDocument;
use crate::error::ConfigError;
use crate::history::WateringHistory;
use crate::timestamp::Timestamp;

/// Reply for commands that need a configuration when none is loaded.
pub const NOT_CONFIGURED: &str = "Watering system is not configured yet.  Please run update_config.";

// ───────────────────────────────────────────────────────────────
// Collaborators
// ───────────────────────────────────────────────────────────────

/// Adapters the core is wired to at boot.
#[derive(Clone)]
pub struct SystemPorts {
    pub actuators: Arc<dyn ActuatorPort>,
    pub clock: Arc<dyn ClockPort>,
    pub storage: Arc<dyn StoragePort>,
    pub events: Arc<dyn EventSink>,
    pub history: Arc<WateringHistory>,
}

/// Everything a run needs once it has left the system's locks.
struct FireContext<D> {
    ports: SystemPorts,
    delay: D,
}

impl<D: DelayNs + Clone> FireContext<D> {
    fn fire(&self, domain: &Domain, duration_secs: Option<f32>, source: FireSource) -> Watered {
        let mut delay = self.delay.clone();
        let watered = domain.water(
            duration_secs,
            &*self.ports.actuators,
            &*self.ports.clock,
            &mut delay,
        );
        self.ports.history.record(&watered.to_string());
        self.ports.events.emit(&AppEvent::Watered {
            domain: watered.domain.clone(),
            actuator_id: watered.actuator_id,
            duration_secs: watered.duration_secs,
            at: watered.at,
            source,
        });
        watered
    }
}

// ───────────────────────────────────────────────────────────────
// WateringSystem
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct SystemState {
    name: String,
    /// Document order.
    domains: Vec<Arc<Domain>>,
    /// Raw text of the last document that passed validation.
    document: Option<String>,
    /// `None` until the first successful load.
    config_path: Option<String>,
}

impl SystemState {
    fn find(&self, name: &str) -> Option<&Arc<Domain>> {
        self.domains.iter().find(|d| d.name() == name)
    }
}

/// The shared watering core.
///
/// `D` is the blocking delay used for runs; each run gets its own clone.
pub struct WateringSystem<D> {
    state: RwLock<SystemState>,
    reload: Mutex<()>,
    ctx: Arc<FireContext<D>>,
    default_config_path: String,
}

impl<D> WateringSystem<D>
where
    D: DelayNs + Clone + Send + Sync + 'static,
{
    /// An unconfigured system.  `config_path` is where documents are
    /// persisted once one has been accepted.
    pub fn new(ports: SystemPorts, delay: D, config_path: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(SystemState::default()),
            reload: Mutex::new(()),
            ctx: Arc::new(FireContext { ports, delay }),
            default_config_path: config_path.into(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted document, if any.
    ///
    /// A missing file is not an error: the system stays unconfigured and
    /// operable.  A present but invalid file leaves it unconfigured and
    /// returns the reason.  The file is never rewritten here.
    pub fn bootstrap(&self) -> Result<(), ConfigError> {
        let path = self.default_config_path.clone();
        let storage = &self.ctx.ports.storage;
        if !storage.exists(&path) {
            info!("WateringSystem: no configuration at {path}, starting unconfigured");
            return Ok(());
        }

        let _reload = self.reload.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = storage.read(&path)?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Parse("configuration file is not UTF-8".into()))?;
        let doc = ConfigDocument::parse(&raw).inspect_err(|e| {
            error!("WateringSystem: {path} rejected: {e}");
        })?;

        let (name, count) = self.install(doc, raw, path);
        info!("WateringSystem: loaded \"{name}\" with {count} domain(s)");
        self.ctx.ports.events.emit(&AppEvent::Bootstrapped {
            name,
            domains: count,
        });
        Ok(())
    }

    /// Validate `raw`, persist it, then swap it in.
    ///
    /// All-or-nothing: on any error the live domains, their watermarks and
    /// the stored document are exactly as before.
    pub fn load_or_replace(&self, raw: &str) -> Result<(), ConfigError> {
        let _reload = self.reload.lock().unwrap_or_else(PoisonError::into_inner);

        let doc = match ConfigDocument::parse(raw) {
            Ok(doc) => doc,
            Err(e) => return Err(self.reject(e)),
        };

        let path = self
            .read_state()
            .config_path
            .clone()
            .unwrap_or_else(|| self.default_config_path.clone());
        if let Err(e) = self.ctx.ports.storage.write(&path, raw.as_bytes()) {
            return Err(self.reject(e.into()));
        }

        let (name, count) = self.install(doc, raw.to_string(), path);
        info!("WateringSystem: configuration replaced, \"{name}\" with {count} domain(s)");
        self.ctx.ports.events.emit(&AppEvent::ConfigReplaced {
            name,
            domains: count,
        });
        Ok(())
    }

    fn reject(&self, e: ConfigError) -> ConfigError {
        warn!("WateringSystem: update rejected: {e}");
        self.ctx
            .ports
            .events
            .emit(&AppEvent::ConfigRejected(e.to_string()));
        e
    }

    /// Build the new domain set and swap it in.  Caller holds `reload`.
    fn install(&self, doc: ConfigDocument, raw: String, path: String) -> (String, usize) {
        let domains: Vec<Arc<Domain>> = {
            let st = self.read_state();
            doc.domains
                .into_iter()
                .map(|spec| {
                    let prev = st.find(&spec.name).map(Arc::as_ref);
                    Arc::new(Domain::succeed(spec, prev))
                })
                .collect()
        };
        let count = domains.len();

        let mut st = self.state.write().unwrap_or_else(PoisonError::into_inner);
        st.name.clone_from(&doc.name);
        st.domains = domains;
        st.document = Some(raw);
        st.config_path = Some(path);
        (doc.name, count)
    }

    // ── Watering ──────────────────────────────────────────────

    /// Water `name` now.  Always answers with text: the confirmation
    /// line, or a "no such domain" message.  Blocks for the run.
    pub fn water_by_name(&self, name: &str, duration_secs: Option<f32>) -> String {
        let Some(domain) = self.domain(name) else {
            self.ctx
                .ports
                .events
                .emit(&AppEvent::DomainMissing(name.to_string()));
            return format!("There is no domain \"{name}\" defined in the watering system");
        };
        self.ctx
            .fire(&domain, duration_secs, FireSource::Manual)
            .to_string()
    }

    /// Claim every domain due at `now` and hand the runs to `delegate`.
    ///
    /// Claims happen under the state lock; the runs themselves are
    /// dispatched after it is released.  Returns the number dispatched.
    pub fn check_schedule(&self, now: &Timestamp, delegate: &mut dyn FireDelegate) -> usize {
        let due: Vec<Arc<Domain>> = self
            .read_state()
            .domains
            .iter()
            .filter(|d| d.claim(now))
            .cloned()
            .collect();

        for domain in &due {
            self.ctx.ports.events.emit(&AppEvent::ScheduleFired {
                domain: domain.name().to_string(),
                at: now.minute_stamp(),
            });
            let ctx = Arc::clone(&self.ctx);
            let d = Arc::clone(domain);
            delegate.dispatch(ScheduledRun::new(domain.name(), move || {
                ctx.fire(&d, None, FireSource::Schedule)
            }));
        }
        due.len()
    }

    // ── Clock ─────────────────────────────────────────────────

    pub fn now(&self) -> Timestamp {
        self.ctx.ports.clock.now()
    }

    pub fn set_time(&self, ts: &Timestamp) -> Result<(), ClockError> {
        self.ctx.ports.clock.set(ts)?;
        info!("WateringSystem: clock set to {ts}");
        self.ctx
            .ports
            .events
            .emit(&AppEvent::ClockSet(ts.minute_stamp()));
        Ok(())
    }

    // ── Read views ────────────────────────────────────────────

    pub fn name(&self) -> String {
        self.read_state().name.clone()
    }

    pub fn is_configured(&self) -> bool {
        self.read_state().document.is_some()
    }

    pub fn config_path(&self) -> Option<String> {
        self.read_state().config_path.clone()
    }

    pub fn domain(&self, name: &str) -> Option<Arc<Domain>> {
        self.read_state().find(name).cloned()
    }

    /// Document order.
    pub fn domain_names(&self) -> Vec<String> {
        self.read_state()
            .domains
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn history(&self) -> &WateringHistory {
        &self.ctx.ports.history
    }

    /// The raw document that last passed validation, verbatim.
    pub fn serialize_config(&self) -> Option<String> {
        self.read_state().document.clone()
    }

    /// Multi-line report of the live configuration and watermarks.
    pub fn describe(&self) -> String {
        let st = self.read_state();
        let Some(path) = st.config_path.as_deref() else {
            return NOT_CONFIGURED.to_string();
        };

        let mut lines = vec![
            format!("Name: {}", st.name),
            format!("Configuration file: {path}"),
            format!("There are {} watering domains configured:", st.domains.len()),
        ];
        for d in &st.domains {
            lines.push(format!(
                " * Domain \"{}\" is using GPIO {} and has a watering duration of {} seconds",
                d.name(),
                d.actuator_id(),
                d.duration_secs()
            ));
            if let Some(at) = d.last_fired() {
                lines.push(format!("  * Last watered: {at}"));
            }
            match d.schedule() {
                Some(table) => {
                    lines.push("  * Watering Schedule".to_string());
                    for day in table.days() {
                        let times: Vec<String> = table.times_for(day).map(|t| t.to_string()).collect();
                        lines.push(format!("   * {day} @ {}", times.join(",")));
                    }
                }
                None => lines.push("  * No watering schedule specified in configuration.".to_string()),
            }
        }
        lines.join("\n")
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SystemState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
