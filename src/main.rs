//! Irrigation Controller Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayBank        LogEventSink   FileStore     SystemClock     │
//! │  (ActuatorPort)   (EventSink)    (StoragePort) (ClockPort)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  WateringSystem · Domain · CommandProcessor            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  threads: scheduler · uart-term · tcp-listen (+ tcp-client,    │
//! │           water runs) · main (clock snapshots)                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};

use irrigation::adapters::hardware::RelayBank;
use irrigation::adapters::log_sink::LogEventSink;
use irrigation::adapters::storage::FileStore;
use irrigation::adapters::time::SystemClock;
use irrigation::adapters::wifi::{self, WifiCredentials, WifiLink};
use irrigation::drivers::delay::ThreadDelay;
use irrigation::drivers::hw_init;
use irrigation::drivers::relay::{ActiveLevel, GpioPin};
use irrigation::drivers::task_pin::{
    SCHEDULER_TASK, TCP_LISTENER_TASK, UART_TERMINAL_TASK, spawn_task,
};
use irrigation::terminal::SessionOptions;
use irrigation::terminal::tcp::TcpLineServer;
use irrigation::terminal::uart::{SerialTransport, serve_serial};
use irrigation::{
    CommandProcessor, ControllerSettings, SchedulerLoop, StoragePort, SystemPorts, ThreadedFire,
    WateringHistory, WateringSystem,
};

/// Optional art printed above the session banner.
const BANNER_PATH: &str = "banner.txt";

/// Never set: the scheduler runs for the life of the process.
static SCHEDULER_STOP: AtomicBool = AtomicBool::new(false);

// ── Platform bootstrap ────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_platform() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_platform() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logger init failed: {e}"))
}

#[cfg(target_os = "espidf")]
fn storage_root() -> Result<std::path::PathBuf> {
    hw_init::mount_storage().context("flash filesystem unavailable")?;
    Ok(irrigation::adapters::storage::FLASH_ROOT.into())
}

/// Host data directory: `$IRRIGATION_DATA_DIR`, else `./data`.
#[cfg(not(target_os = "espidf"))]
fn storage_root() -> Result<std::path::PathBuf> {
    hw_init::mount_storage()?;
    let root: std::path::PathBuf = std::env::var_os("IRRIGATION_DATA_DIR")
        .map_or_else(|| "data".into(), Into::into);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("cannot create data directory {}", root.display()))?;
    Ok(root)
}

fn banner_art(store: &dyn StoragePort) -> Option<String> {
    store
        .read(BANNER_PATH)
        .ok()
        .map(|b| String::from_utf8_lossy(&b).trim_end().to_string())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform + logging ─────────────────────────────────
    init_platform()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigation Controller v{:<13}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage + settings ─────────────────────────────────
    let store = Arc::new(FileStore::new(storage_root()?));
    let settings = ControllerSettings::load_or_default(store.as_ref());
    info!(
        "Settings: config={} tcp={} poll={}s history={}",
        settings.config_path, settings.tcp_port, settings.poll_interval_secs, settings.history_capacity
    );

    // ── 3. Clock ──────────────────────────────────────────────
    let clock = Arc::new(SystemClock::new());
    clock.restore_snapshot(store.as_ref());

    // ── 4. Watering core ──────────────────────────────────────
    let relays = Arc::new(RelayBank::new(GpioPin::output, ActiveLevel::High));
    let history = Arc::new(WateringHistory::load(store.clone(), settings.history_capacity));
    let ports = SystemPorts {
        actuators: relays.clone(),
        clock: clock.clone(),
        storage: store.clone(),
        events: Arc::new(LogEventSink::new()),
        history,
    };
    let system = Arc::new(WateringSystem::new(ports, ThreadDelay, settings.config_path.clone()));
    if let Err(e) = system.bootstrap() {
        warn!("Stored configuration rejected ({e}); starting unconfigured");
    }
    relays.release_all(
        system
            .domain_names()
            .iter()
            .filter_map(|name| system.domain(name))
            .map(|d| d.actuator_id()),
    );
    info!("Boot: relays {:?} released", relays.initialised());

    let processor = CommandProcessor::new(system.clone(), settings.max_manual_duration_secs);
    let session_opts = SessionOptions {
        echo: false,
        version: settings.firmware_version.clone(),
        banner_art: banner_art(store.as_ref()),
        label: String::new(),
    };

    // ── 5. Network + serial console ───────────────────────────
    #[cfg(target_os = "espidf")]
    let (_wifi, serial) = {
        use esp_idf_hal::peripherals::Peripherals;
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take().ok();

        let link = WifiCredentials::load(store.as_ref())
            .and_then(|creds| WifiLink::connect(peripherals.modem, sysloop, nvs, &creds));
        wifi::report(&link);

        // Typed pins must match pins::UART_TX_GPIO / UART_RX_GPIO.
        let serial = SerialTransport::new(
            peripherals.uart1,
            peripherals.pins.gpio4,
            peripherals.pins.gpio5,
            settings.uart_baud,
        )
        .map_err(|e| anyhow::anyhow!("UART init failed: {e}"))?;
        (link.ok(), serial)
    };

    #[cfg(not(target_os = "espidf"))]
    let (_wifi, serial) = {
        let link = WifiCredentials::load(store.as_ref()).and_then(|creds| WifiLink::connect(&creds));
        if store.exists(wifi::WIFI_CONFIG_PATH) {
            wifi::report(&link);
        }
        (link.ok(), SerialTransport::new())
    };

    // ── 6. Threads ────────────────────────────────────────────
    let sched_system = system.clone();
    let poll = Duration::from_secs(u64::from(settings.poll_interval_secs));
    spawn_task(SCHEDULER_TASK, move || {
        let mut fire = ThreadedFire::new();
        SchedulerLoop::new(sched_system, poll).run_until(&mut fire, &SCHEDULER_STOP);
    })
    .context("scheduler thread")?;

    let uart_processor = processor.clone();
    let uart_opts = session_opts.clone();
    spawn_task(UART_TERMINAL_TASK, move || {
        serve_serial(serial, uart_processor, uart_opts);
    })
    .context("serial terminal thread")?;

    match TcpLineServer::bind(settings.tcp_port, processor, session_opts) {
        Ok(server) => {
            spawn_task(TCP_LISTENER_TASK, move || server.serve()).context("TCP listener thread")?;
        }
        Err(e) => error!("TCP: cannot listen on port {}: {e}", settings.tcp_port),
    }

    info!("System ready: \"{}\"", system.name());

    // ── 7. Clock snapshots ────────────────────────────────────
    let save_every = Duration::from_secs(u64::from(settings.clock_save_interval_secs));
    loop {
        std::thread::sleep(save_every);
        if let Err(e) = clock.save_snapshot(store.as_ref()) {
            warn!("Clock: snapshot save failed ({e})");
        }
    }
}
