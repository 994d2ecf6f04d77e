use std::sync::Arc;

use crate::{is_unset_marker, StateBackend, StoreError};

const STATE_ON: &str = "on";
const STATE_OFF: &str = "off";

pub fn stuck_state(stuck: bool) -> &'static str {
    if stuck {
        STATE_ON
    } else {
        STATE_OFF
    }
}

/// Persisted stuck override. Off until something turns it on.
pub struct StuckOverrideStore {
    backend: Arc<dyn StateBackend>,
    key: String,
    value: bool,
}

impl StuckOverrideStore {
    /// Last persisted value, `None` when nothing usable was stored.
    pub fn load(backend: &dyn StateBackend, key: &str) -> Result<Option<bool>, StoreError> {
        let Some(raw) = backend.load(key)? else {
            return Ok(None);
        };
        match raw.trim() {
            STATE_ON => Ok(Some(true)),
            STATE_OFF => Ok(Some(false)),
            other if is_unset_marker(other) => Ok(None),
            other => {
                tracing::warn!(key, value = other, "ignoring malformed stuck state");
                Ok(None)
            }
        }
    }

    pub fn restore(backend: Arc<dyn StateBackend>, key: String) -> Result<Self, StoreError> {
        let value = Self::load(backend.as_ref(), &key)?.unwrap_or(false);
        Ok(Self {
            backend,
            key,
            value,
        })
    }

    pub fn get(&self) -> bool {
        self.value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Updates the flag, then persists it. The new value stands even if persisting fails.
    pub fn set(&mut self, stuck: bool) -> Result<(), StoreError> {
        self.value = stuck;
        self.backend
            .save(&self.key, stuck_state(stuck))
            .map_err(|err| StoreError::persist(&self.key, err))
    }
}
