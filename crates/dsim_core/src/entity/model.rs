//! Entities and save requests.

use crate::error::CoreError;
use crate::key::Key;
use dsim_codec::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named property values of an entity.
pub type Properties = BTreeMap<String, Value>;

/// A stored entity: its key and properties.
///
/// Entities handed out by the store are owned copies; changing one never
/// reaches the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    properties: Properties,
}

impl Entity {
    /// Creates an entity.
    pub fn new(key: Key, properties: Properties) -> Self {
        Self { key, properties }
    }

    /// The entity key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// All properties.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Mutable access to the properties.
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// A single property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Sets a property, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.into(), value.into())
    }

    /// Splits the entity into key and properties.
    #[must_use]
    pub fn into_parts(self) -> (Key, Properties) {
        (self.key, self.properties)
    }
}

/// How a save treats the target slot.
///
/// The in-memory table overwrites in every mode; the mode is carried for
/// transaction queues and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationMode {
    /// Create a new entity.
    Insert,
    /// Replace an existing entity.
    Update,
    /// Create or replace.
    #[default]
    Upsert,
}

impl MutationMode {
    /// Lower-case name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MutationMode::Insert => "insert",
            MutationMode::Update => "update",
            MutationMode::Upsert => "upsert",
        }
    }
}

impl fmt::Display for MutationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(MutationMode::Insert),
            "update" => Ok(MutationMode::Update),
            "upsert" => Ok(MutationMode::Upsert),
            _ => Err(CoreError::invalid_argument(format!(
                "Method {s} not recognized."
            ))),
        }
    }
}

/// Input to a save: a key, properties, and an optional declared mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWrite {
    /// Target key; incomplete keys get an id on save.
    pub key: Key,
    /// Properties to store.
    pub data: Properties,
    /// Declared mode; `None` means upsert.
    pub method: Option<MutationMode>,
}

impl EntityWrite {
    /// Creates a write with no declared mode.
    pub fn new(key: Key, data: Properties) -> Self {
        Self {
            key,
            data,
            method: None,
        }
    }

    /// Sets the declared mode.
    #[must_use]
    pub fn with_method(mut self, method: MutationMode) -> Self {
        self.method = Some(method);
        self
    }

    /// The declared mode, defaulting to upsert.
    #[must_use]
    pub fn mode(&self) -> MutationMode {
        self.method.unwrap_or_default()
    }
}

impl From<Entity> for EntityWrite {
    fn from(entity: Entity) -> Self {
        let (key, data) = entity.into_parts();
        Self::new(key, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("insert".parse::<MutationMode>().unwrap(), MutationMode::Insert);
        assert_eq!("UPDATE".parse::<MutationMode>().unwrap(), MutationMode::Update);
        assert_eq!("Upsert".parse::<MutationMode>().unwrap(), MutationMode::Upsert);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "replace".parse::<MutationMode>().unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "Method replace not recognized.");
    }

    #[test]
    fn write_defaults_to_upsert() {
        let write = EntityWrite::new(Key::new("Person", 1), Properties::new());
        assert_eq!(write.mode(), MutationMode::Upsert);
        assert_eq!(
            write.with_method(MutationMode::Insert).mode(),
            MutationMode::Insert
        );
    }

    #[test]
    fn entity_property_access() {
        let mut entity = Entity::new(Key::new("Person", 1), Properties::new());
        assert!(entity.set("name", "ada").is_none());
        assert_eq!(entity.get("name"), Some(&Value::from("ada")));
        assert_eq!(entity.set("name", "grace"), Some(Value::from("ada")));
        assert_eq!(entity.properties().len(), 1);
    }
}
