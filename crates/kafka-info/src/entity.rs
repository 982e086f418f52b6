//! Catalog entity adapter
//!
//! Only the annotations of the entity being displayed are read. The host page
//! injects the entity as JSON via `<meta name="kafka-info:entity">` or
//! `window.__KAFKA_INFO_ENTITY__`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::read_injected;
use crate::error::{ConfigError, ConfigResult};

/// Annotation listing the entity's consumer groups, comma separated
pub const KAFKA_INFO_ANNOTATION: &str = "kafka-info/consumer-groups";

const ENTITY_META: &str = "kafka-info:entity";
const ENTITY_GLOBAL: &str = "__KAFKA_INFO_ENTITY__";

/// Catalog entity, reduced to the fields the card reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entity {
    #[serde(default)]
    pub metadata: EntityMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntityMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: EntityMetadata {
                name: name.into(),
                annotations: BTreeMap::new(),
            },
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
            what: "entity",
            message: e.to_string(),
        })
    }

    /// Load the entity injected by the host page
    pub fn load() -> ConfigResult<Self> {
        let json = read_injected(ENTITY_META, ENTITY_GLOBAL).ok_or(ConfigError::Missing("entity"))?;
        Self::from_json(&json)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// Consumer groups named by [`KAFKA_INFO_ANNOTATION`]
    ///
    /// An absent annotation yields an empty set.
    pub fn consumer_groups(&self) -> ConsumerGroupSet {
        self.annotation(KAFKA_INFO_ANNOTATION)
            .map(ConsumerGroupSet::parse)
            .unwrap_or_default()
    }
}

/// Whether the card has anything to show for `entity`
pub fn is_plugin_applicable_to_entity(entity: &Entity) -> bool {
    entity
        .annotation(KAFKA_INFO_ANNOTATION)
        .is_some_and(|v| !v.trim().is_empty())
}

/// Set of consumer group names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerGroupSet(BTreeSet<String>);

impl ConsumerGroupSet {
    /// Split a comma separated annotation value
    ///
    /// Names are trimmed; blank entries are dropped.
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Exact membership test
    pub fn contains(&self, group: &str) -> bool {
        self.0.contains(group)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ConsumerGroupSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ConsumerGroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        f.write_str(&names.join(", "))
    }
}
