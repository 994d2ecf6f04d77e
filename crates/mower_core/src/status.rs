use serde::{Deserialize, Serialize};

use crate::{classify, is_charging, Activity, SignalSnapshot};

/// Activities in display order.
pub const ACTIVITY_OPTIONS: [Activity; 4] = [
    Activity::Mowing,
    Activity::Docked,
    Activity::Error,
    Activity::Charging,
];

/// What the host shows for the mower. Derived on demand; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MowerStatus {
    pub available: bool,
    pub activity: Option<Activity>,
    /// `None` whenever the mower is unavailable.
    pub charging: Option<bool>,
    pub power_watts: Option<f64>,
    pub stuck: bool,
}

impl MowerStatus {
    pub fn derive(snapshot: &SignalSnapshot, stuck: bool) -> Self {
        let power = snapshot.classifiable_power();
        Self {
            available: power.is_some(),
            activity: power.map(|watts| classify(watts, stuck)),
            charging: power.map(is_charging),
            power_watts: snapshot.power_watts.value(),
            stuck,
        }
    }
}
