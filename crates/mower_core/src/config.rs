//! Mower configuration and the stable identifiers derived from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CycleKind, SourceId};

pub const DEFAULT_MOWER_NAME: &str = "robby";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("mower name must be non-empty lowercase ascii, digits or '_', got {0:?}")]
    InvalidName(String),
    #[error("{field} source id is empty")]
    EmptySource { field: &'static str },
    #[error("power and switch sources must differ, both are {0}")]
    SameSource(SourceId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MowerConfig {
    /// Prefix for every entity id and durable key.
    pub name: String,
    pub power_source: SourceId,
    pub switch_source: SourceId,
}

impl MowerConfig {
    pub fn new(name: &str, power_source: &str, switch_source: &str) -> Result<Self, ConfigError> {
        let config = Self {
            name: name.to_string(),
            power_source: SourceId(power_source.trim().to_string()),
            switch_source: SourceId(switch_source.trim().to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name_ok = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !name_ok {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        if self.power_source.0.is_empty() {
            return Err(ConfigError::EmptySource { field: "power" });
        }
        if self.switch_source.0.is_empty() {
            return Err(ConfigError::EmptySource { field: "switch" });
        }
        if self.power_source == self.switch_source {
            return Err(ConfigError::SameSource(self.power_source.clone()));
        }
        Ok(())
    }

    pub fn stuck_source(&self) -> SourceId {
        SourceId(format!("switch.{}_stuck", self.name))
    }

    pub fn timestamp_entity(&self, kind: CycleKind) -> SourceId {
        SourceId(format!("datetime.{}_{}", self.name, kind.key_suffix()))
    }

    /// Reverse of [`MowerConfig::timestamp_entity`].
    pub fn kind_for_entity(&self, entity: &SourceId) -> Option<CycleKind> {
        CycleKind::ALL
            .into_iter()
            .find(|kind| self.timestamp_entity(*kind) == *entity)
    }

    pub fn stuck_key(&self) -> String {
        format!("{}_stuck", self.name)
    }

    pub fn timestamp_key(&self, kind: CycleKind) -> String {
        format!("{}_{}", self.name, kind.key_suffix())
    }

    /// Sources whose changes trigger an evaluation.
    pub fn watched_sources(&self) -> [SourceId; 3] {
        [
            self.power_source.clone(),
            self.switch_source.clone(),
            self.stuck_source(),
        ]
    }
}
