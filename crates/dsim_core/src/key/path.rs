//! Hierarchical keys.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Numeric id.
    Id(i64),
    /// String name.
    Name(String),
    /// Numeric id carried as decimal text.
    ///
    /// Canonicalizes to [`Identifier::Id`]; `Int("2")` and `Id(2)` address
    /// the same entity.
    Int(String),
}

impl Identifier {
    /// Returns the canonical form of this identifier.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if an [`Identifier::Int`] does not hold
    /// a 64-bit integer.
    pub fn canonical(&self) -> CoreResult<Self> {
        match self {
            Identifier::Int(text) => text.parse::<i64>().map(Identifier::Id).map_err(|_| {
                CoreError::invalid_argument(format!("invalid numeric id {text:?}"))
            }),
            other => Ok(other.clone()),
        }
    }

    /// The numeric id, if this identifier is (or encodes) one.
    #[must_use]
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Identifier::Id(n) => Some(*n),
            Identifier::Int(text) => text.parse().ok(),
            Identifier::Name(_) => None,
        }
    }

    /// The name, if this identifier is one.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Identifier::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(n) => write!(f, "{n}"),
            Identifier::Name(name) | Identifier::Int(name) => f.write_str(name),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Id(id)
    }
}

impl From<i32> for Identifier {
    fn from(id: i32) -> Self {
        Identifier::Id(i64::from(id))
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

/// One `(kind, identifier)` step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    /// Entity kind.
    pub kind: String,
    /// Identifier; `None` only on the final segment of an incomplete key.
    pub identifier: Option<Identifier>,
}

impl PathSegment {
    /// Creates a segment.
    pub fn new(kind: impl Into<String>, identifier: Option<Identifier>) -> Self {
        Self {
            kind: kind.into(),
            identifier,
        }
    }
}

/// A hierarchical entity key: an ordered path of segments plus a namespace.
///
/// Keys are plain values. Structural validation (non-empty kinds, only the
/// last segment incomplete) happens when the key is canonicalized by
/// [`crate::KeyCodec`], which every store operation does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    namespace: Option<String>,
    segments: Vec<PathSegment>,
}

impl Key {
    /// Creates a single-segment key.
    pub fn new(kind: impl Into<String>, identifier: impl Into<Identifier>) -> Self {
        Self {
            namespace: None,
            segments: vec![PathSegment::new(kind, Some(identifier.into()))],
        }
    }

    /// Creates a single-segment key with no identifier yet.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            namespace: None,
            segments: vec![PathSegment::new(kind, None)],
        }
    }

    /// Builds a key from a flat `[kind, id, kind, id, ...]` path.
    ///
    /// An even-length path yields a complete key, an odd-length path an
    /// incomplete one. The [`crate::path!`] macro builds the element list.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an empty path or a kind position
    /// that does not hold a name.
    pub fn from_path<I>(path: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut segments = Vec::new();
        let mut elements = path.into_iter();
        while let Some(kind) = elements.next() {
            let kind = match kind {
                Identifier::Name(kind) => kind,
                other => {
                    return Err(CoreError::invalid_argument(format!(
                        "key path kind must be a string, got {other}"
                    )))
                }
            };
            segments.push(PathSegment::new(kind, elements.next()));
        }
        if segments.is_empty() {
            return Err(CoreError::invalid_argument("key path must not be empty"));
        }
        Ok(Self {
            namespace: None,
            segments,
        })
    }

    /// Creates a key from prepared segments.
    pub fn from_segments(namespace: Option<String>, segments: Vec<PathSegment>) -> Self {
        Self {
            namespace,
            segments,
        }
    }

    /// Returns this key placed in `namespace`.
    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Returns a key for a child entity of this key.
    #[must_use]
    pub fn child(&self, kind: impl Into<String>, identifier: impl Into<Identifier>) -> Self {
        self.push(PathSegment::new(kind, Some(identifier.into())))
    }

    /// Returns an incomplete key for a child entity of this key.
    #[must_use]
    pub fn incomplete_child(&self, kind: impl Into<String>) -> Self {
        self.push(PathSegment::new(kind, None))
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut key = self.clone();
        key.segments.push(segment);
        key
    }

    /// The namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// All path segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Kind of the entity this key addresses.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.last().map_or("", |s| s.kind.as_str())
    }

    /// Identifier of the final segment.
    #[must_use]
    pub fn identifier(&self) -> Option<&Identifier> {
        self.last().and_then(|s| s.identifier.as_ref())
    }

    /// Numeric id of the final segment.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.identifier().and_then(Identifier::as_id)
    }

    /// Name of the final segment.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.identifier().and_then(Identifier::as_name)
    }

    /// Whether the final segment carries an identifier.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.identifier().is_some()
    }

    /// Key of the parent entity, if this key has ancestors.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Flattened path with identifiers rendered as text.
    ///
    /// Numeric ids read back as strings: `Person/2` yields
    /// `["Person", "2"]`.
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            path.push(segment.kind.clone());
            if let Some(id) = &segment.identifier {
                path.push(id.to_string());
            }
        }
        path
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match &segment.identifier {
                Some(Identifier::Name(name)) => write!(f, "{}({name:?})", segment.kind)?,
                Some(id) => write!(f, "{}({id})", segment.kind)?,
                None => write!(f, "{}(?)", segment.kind)?,
            }
        }
        Ok(())
    }
}

/// Builds a flat key path of [`Identifier`]s for [`Key::from_path`].
///
/// ```
/// use dsim_core::{path, Key};
///
/// let key = Key::from_path(path!["Person", 2, "Pet", "rex"]).unwrap();
/// assert_eq!(key.path(), vec!["Person", "2", "Pet", "rex"]);
/// ```
#[macro_export]
macro_rules! path {
    ($($element:expr),* $(,)?) => {
        vec![$($crate::Identifier::from($element)),*]
    };
}
