use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mower_core::{CycleKind, CycleTimestamps, MowerConfig};

use crate::{is_unset_marker, StateBackend, StoreError};

/// Four independent, overwrite-only cycle slots.
pub struct CycleTimestampStore {
    backend: Arc<dyn StateBackend>,
    keys: BTreeMap<CycleKind, String>,
    values: CycleTimestamps,
}

impl CycleTimestampStore {
    pub fn load(
        backend: &dyn StateBackend,
        key: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = backend.load(key)? else {
            return Ok(None);
        };
        if is_unset_marker(&raw) {
            return Ok(None);
        }
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(err) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    error = %err,
                    "ignoring malformed cycle timestamp"
                );
                Ok(None)
            }
        }
    }

    pub fn restore(
        backend: Arc<dyn StateBackend>,
        config: &MowerConfig,
    ) -> Result<Self, StoreError> {
        let mut keys = BTreeMap::new();
        let mut values = CycleTimestamps::default();
        for kind in CycleKind::ALL {
            let key = config.timestamp_key(kind);
            values.set(kind, Self::load(backend.as_ref(), &key)?);
            keys.insert(kind, key);
        }
        Ok(Self {
            backend,
            keys,
            values,
        })
    }

    pub fn get(&self, kind: CycleKind) -> Option<DateTime<Utc>> {
        self.values.get(kind)
    }

    pub fn all(&self) -> CycleTimestamps {
        self.values
    }

    /// Overwrites the slot, then persists it. The new value stands even if persisting fails.
    pub fn record(&mut self, kind: CycleKind, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.values.set(kind, Some(at));
        let key = &self.keys[&kind];
        self.backend
            .save(key, &at.to_rfc3339())
            .map_err(|err| StoreError::persist(key, err))
    }
}
