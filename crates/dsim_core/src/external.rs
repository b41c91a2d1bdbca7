//! Collaborators the store consumes but does not implement.

use crate::config::PROJECT_ID_ENV;
use crate::error::{CoreError, CoreResult};
use crate::key::Key;
use std::env;

/// Converts keys to and from the legacy url-safe text form.
pub trait LegacyKeyCodec: Send + Sync {
    /// Encodes `key` for `project_id`, optionally with a location prefix.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn encode(&self, project_id: &str, key: &Key, location_prefix: Option<&str>)
        -> CoreResult<String>;

    /// Decodes a url-safe key.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn decode(&self, text: &str) -> CoreResult<Key>;
}

/// Supplies the project id.
pub trait ProjectIdResolver: Send + Sync {
    /// Returns the project id.
    ///
    /// # Errors
    ///
    /// Fails with `ProjectId` when no id can be determined.
    fn project_id(&self) -> CoreResult<String>;
}

/// A fixed project id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticProjectId(String);

impl StaticProjectId {
    /// Wraps `project_id`.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self(project_id.into())
    }
}

impl ProjectIdResolver for StaticProjectId {
    fn project_id(&self) -> CoreResult<String> {
        Ok(self.0.clone())
    }
}

/// Reads the project id from an environment variable on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvProjectId {
    variable: String,
}

impl EnvProjectId {
    /// Reads from `variable` instead of `DATASTORE_PROJECT_ID`.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvProjectId {
    fn default() -> Self {
        Self::new(PROJECT_ID_ENV)
    }
}

impl ProjectIdResolver for EnvProjectId {
    fn project_id(&self) -> CoreResult<String> {
        env::var(&self.variable)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::project_id(format!("{} is not set", self.variable)))
    }
}
