//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread` creates a FreeRTOS
//! task pinned to a specific CPU core with explicit priority and stack
//! size.  On non-ESP targets, falls back to a plain named thread.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks.  `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi and lwIP run here.
    Pro = 0,
    /// Core 1 (APP_CPU): scheduler, terminals and watering runs.
    App = 1,
}

/// How a controller thread is created.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Null-terminated (e.g. `"sched\0"`).
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

pub const SCHEDULER_TASK: TaskSpec = TaskSpec {
    name: "sched\0",
    core: Core::App,
    priority: 5,
    stack_kb: 6,
};

/// One per watering run; lives for the run's duration.
pub const WATER_RUN_TASK: TaskSpec = TaskSpec {
    name: "water\0",
    core: Core::App,
    priority: 4,
    stack_kb: 4,
};

/// Terminal sessions keep their 8 KB line buffer on the stack.
pub const UART_TERMINAL_TASK: TaskSpec = TaskSpec {
    name: "uart-term\0",
    core: Core::App,
    priority: 3,
    stack_kb: 20,
};

pub const TCP_LISTENER_TASK: TaskSpec = TaskSpec {
    name: "tcp-listen\0",
    core: Core::Pro,
    priority: 3,
    stack_kb: 6,
};

pub const TCP_CLIENT_TASK: TaskSpec = TaskSpec {
    name: "tcp-client\0",
    core: Core::Pro,
    priority: 3,
    stack_kb: 20,
};

/// Spawn a thread pinned per `spec`.
#[cfg(target_os = "espidf")]
pub fn spawn_task(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the default
    // constructor and only read by the next pthread_create on this thread.
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr().cast();
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    log::debug!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    log::debug!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    // Host threads need more headroom than the FreeRTOS budgets.
    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb.max(64) * 1024)
        .spawn(f)
}
