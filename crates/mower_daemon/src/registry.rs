//! In-process stand-in for the host's state machine.
//!
//! Holds the current value of every source and fans out changes to
//! subscribers. Each subscriber gets its own unbounded queue, so changes are
//! delivered in the order they were applied and none are dropped.

use std::collections::{BTreeMap, HashMap, HashSet};

use mower_core::{SourceId, SourceLookup, SourceStates};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub entity_id: SourceId,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

struct Subscriber {
    sources: HashSet<SourceId>,
    tx: mpsc::UnboundedSender<StateChange>,
}

#[derive(Default)]
struct Inner {
    states: HashMap<SourceId, String>,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
pub struct SourceRegistry {
    inner: Mutex<Inner>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values of `sources` plus the ordered change feed that follows
    /// them. Both are taken under one lock, so no change falls between the
    /// snapshot and the first queued entry. The feed ends when the registry
    /// is dropped.
    pub fn subscribe(
        &self,
        sources: impl IntoIterator<Item = SourceId>,
    ) -> (SourceStates, mpsc::UnboundedReceiver<StateChange>) {
        let sources: HashSet<SourceId> = sources.into_iter().collect();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let mut seed = SourceStates::default();
        for id in &sources {
            seed.set(id.clone(), inner.states.get(id).cloned());
        }
        inner.subscribers.push(Subscriber { sources, tx });
        (seed, rx)
    }

    /// Sets a source, `None` meaning unavailable. Subscribers hear about it
    /// only when the value actually changed.
    pub fn set_state(&self, entity_id: SourceId, value: Option<String>) -> Option<StateChange> {
        let mut inner = self.inner.lock();
        let old_value = match &value {
            Some(new) => inner.states.insert(entity_id.clone(), new.clone()),
            None => inner.states.remove(&entity_id),
        };
        if old_value == value {
            return None;
        }
        let change = StateChange {
            entity_id,
            old_value,
            new_value: value,
        };
        // Sent under the lock so concurrent writers cannot reorder the feed.
        inner.subscribers.retain(|sub| {
            !sub.sources.contains(&change.entity_id) || sub.tx.send(change.clone()).is_ok()
        });
        Some(change)
    }

    pub fn states(&self) -> BTreeMap<SourceId, String> {
        self.inner
            .lock()
            .states
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }
}

impl SourceLookup for SourceRegistry {
    fn get_value(&self, id: &SourceId) -> Option<String> {
        self.inner.lock().states.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> SourceId {
        SourceId(raw.to_string())
    }

    #[test]
    fn unchanged_value_is_not_a_change() {
        let registry = SourceRegistry::new();
        let (_, mut rx) = registry.subscribe([id("sensor.power")]);
        assert!(registry.set_state(id("sensor.power"), Some("1.5".into())).is_some());
        assert!(registry.set_state(id("sensor.power"), Some("1.5".into())).is_none());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn changes_arrive_in_order() {
        let registry = SourceRegistry::new();
        let (_, mut rx) = registry.subscribe([id("sensor.power"), id("switch.plug")]);
        registry.set_state(id("sensor.power"), Some("2.5".into()));
        registry.set_state(id("switch.plug"), Some("on".into()));
        registry.set_state(id("sensor.power"), None);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.entity_id, id("sensor.power"));
        assert_eq!(first.new_value.as_deref(), Some("2.5"));
        assert_eq!(rx.try_recv().unwrap().entity_id, id("switch.plug"));
        let last = rx.try_recv().unwrap();
        assert_eq!(last.old_value.as_deref(), Some("2.5"));
        assert_eq!(last.new_value, None);
    }

    #[test]
    fn unwatched_sources_are_filtered() {
        let registry = SourceRegistry::new();
        let (_, mut rx) = registry.subscribe([id("sensor.power")]);
        registry.set_state(id("datetime.robby_start_mowing_cycle"), Some("x".into()));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            registry.get_value(&id("datetime.robby_start_mowing_cycle")).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let registry = SourceRegistry::new();
        drop(registry.subscribe([id("sensor.power")]).1);
        registry.set_state(id("sensor.power"), Some("1".into()));
        assert!(registry.inner.lock().subscribers.is_empty());
    }

    #[test]
    fn subscribe_seeds_current_values() {
        let registry = SourceRegistry::new();
        registry.set_state(id("sensor.power"), Some("2.5".into()));
        registry.set_state(id("switch.other"), Some("on".into()));

        let (seed, mut rx) = registry.subscribe([id("sensor.power"), id("switch.plug")]);
        assert_eq!(seed.get_value(&id("sensor.power")).as_deref(), Some("2.5"));
        assert_eq!(seed.get_value(&id("switch.plug")), None);
        assert_eq!(seed.get_value(&id("switch.other")), None);
        assert!(rx.try_recv().is_err());
    }
}
