//! `mower_store`: durable last-known values for the mower.
//!
//! The stuck flag and the four cycle timestamps are the only state that
//! survives a restart. Each store restores explicitly at construction and
//! keeps its in-memory value even when a write fails.

mod backend;
mod error;
mod stuck;
mod timestamps;

use std::sync::Arc;

use mower_core::MowerConfig;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend};
pub use error::StoreError;
pub use stuck::{stuck_state, StuckOverrideStore};
pub use timestamps::CycleTimestampStore;

/// Both durable stores, restored from one backend.
pub struct MowerStores {
    pub stuck: StuckOverrideStore,
    pub timestamps: CycleTimestampStore,
}

impl MowerStores {
    pub fn restore(
        backend: Arc<dyn StateBackend>,
        config: &MowerConfig,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            stuck: StuckOverrideStore::restore(Arc::clone(&backend), config.stuck_key())?,
            timestamps: CycleTimestampStore::restore(backend, config)?,
        })
    }
}

/// Host states that mean "no value" rather than a malformed one.
pub(crate) fn is_unset_marker(raw: &str) -> bool {
    matches!(raw.trim(), "" | "unknown" | "unavailable")
}
