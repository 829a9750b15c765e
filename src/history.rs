//! Watering history.
//!
//! Keeps the confirmation line of the last `capacity` successful fires
//! (scheduled or manual) in a ring, oldest first, and mirrors it to flash
//! under [`HISTORY_PATH`] as a postcard blob so the `history` command
//! survives a reboot.
//!
//! Persistence is best-effort: a failed write is logged and the fire it
//! records still counts.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

use crate::app::ports::{StorageError, StoragePort};

pub const HISTORY_PATH: &str = "history.bin";

/// Reply for an empty history.
pub const EMPTY_HISTORY: &str = "No watering history recorded yet";

/// Bounded, persisted ring of watering confirmations.
pub struct WateringHistory {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
    store: Arc<dyn StoragePort>,
}

impl WateringHistory {
    /// Load the persisted ring, or start empty.  A blob longer than
    /// `capacity` keeps only its newest entries.
    pub fn load(store: Arc<dyn StoragePort>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries: VecDeque<String> = match store.read(HISTORY_PATH) {
            Ok(bytes) => match postcard::from_bytes::<Vec<String>>(&bytes) {
                Ok(v) => v.into(),
                Err(_) => {
                    warn!("History: stored blob corrupted, starting empty");
                    VecDeque::new()
                }
            },
            Err(StorageError::NotFound) => VecDeque::new(),
            Err(e) => {
                warn!("History: read failed ({e}), starting empty");
                VecDeque::new()
            }
        };
        while entries.len() > capacity {
            entries.pop_front();
        }
        Self {
            entries: Mutex::new(entries),
            capacity,
            store,
        }
    }

    /// Append one line, evicting the oldest when full, then persist.
    ///
    /// The ring stays locked until the blob is written, so concurrent
    /// records reach storage in the order they entered the ring.
    pub fn record(&self, line: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(line.to_string());

        match postcard::to_allocvec(entries.make_contiguous()) {
            Ok(bytes) => {
                if let Err(e) = self.store.write(HISTORY_PATH, &bytes) {
                    warn!("History: persist failed: {e}");
                }
            }
            Err(e) => warn!("History: encode failed: {e}"),
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Text for the `history` command.
    pub fn render(&self) -> String {
        let entries = self.entries();
        if entries.is_empty() {
            EMPTY_HISTORY.to_string()
        } else {
            entries.join("\n")
        }
    }
}
