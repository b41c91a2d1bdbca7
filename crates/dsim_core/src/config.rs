//! Store configuration.

use std::env;

/// Environment variable consulted for the project id.
pub const PROJECT_ID_ENV: &str = "DATASTORE_PROJECT_ID";

/// Environment variable consulted for the default namespace.
pub const NAMESPACE_ENV: &str = "DATASTORE_NAMESPACE";

/// Offset added to every generated id, keeping them visually apart from
/// small hand-written test ids.
pub const DEFAULT_ID_BASE: i64 = 5_000_000_000_000_000;

/// Configuration for a [`crate::Datastore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace applied to keys and queries built through the store.
    pub namespace: Option<String>,

    /// Project id reported in allocation metadata and used for legacy
    /// url-safe keys.
    pub project_id: Option<String>,

    /// First id handed out by the id allocator.
    pub id_base: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            project_id: None,
            id_base: DEFAULT_ID_BASE,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from `DATASTORE_PROJECT_ID` and
    /// `DATASTORE_NAMESPACE`. Unset or empty variables are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            namespace: read(NAMESPACE_ENV),
            project_id: read(PROJECT_ID_ENV),
            ..Self::default()
        }
    }

    /// Sets the default namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the project id.
    #[must_use]
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the id allocator base.
    #[must_use]
    pub const fn id_base(mut self, base: i64) -> Self {
        self.id_base = base;
        self
    }
}
