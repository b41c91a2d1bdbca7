//! Key canonicalization and serialization.

use crate::error::{CoreError, CoreResult};
use crate::key::{IdAllocator, Identifier, Key, PathSegment};
use dsim_codec::{CanonicalEncoder, Value};

/// Canonical, comparable form of a key.
///
/// The bytes are a canonical CBOR sequence: the namespace (text or null),
/// then for every segment its kind (text) and identifier (integer for ids,
/// text for names, null when absent). Two keys serialize to the same bytes
/// exactly when they address the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    bytes: Vec<u8>,
    path_start: usize,
    // excludes the trailing null identifier of an incomplete key
    prefix_end: usize,
}

impl CanonicalKey {
    /// The full serialized form.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The path portion, without the namespace item.
    #[must_use]
    pub fn path_bytes(&self) -> &[u8] {
        &self.bytes[self.path_start..]
    }

    /// The path bytes used when this key acts as an ancestor.
    ///
    /// An incomplete key contributes its path up to and including the final
    /// kind, so `Person` covers every `Person/...` key.
    #[must_use]
    pub fn ancestor_prefix(&self) -> &[u8] {
        &self.bytes[self.path_start..self.prefix_end]
    }

    /// Whether this key's path extends `ancestor`'s path.
    ///
    /// Items are self-delimiting, so the byte prefix test never matches
    /// part of an identifier: `Person/1` is not an ancestor of `Person/10`.
    /// A complete ancestor never matches itself.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &CanonicalKey) -> bool {
        let path = self.path_bytes();
        let prefix = ancestor.ancestor_prefix();
        path.len() > prefix.len() && path.starts_with(prefix)
    }
}

/// Normalizes keys and turns them into [`CanonicalKey`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    /// Rewrites every identifier to its canonical form.
    ///
    /// Incomplete keys stay incomplete.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if the key has no segments, an empty
    /// kind, an incomplete non-final segment, or a malformed numeric id.
    pub fn canonicalize(key: &Key) -> CoreResult<Key> {
        let segments = key.segments();
        if segments.is_empty() {
            return Err(CoreError::invalid_argument("key path must not be empty"));
        }
        let last = segments.len() - 1;
        let mut canonical = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if segment.kind.is_empty() {
                return Err(CoreError::invalid_argument("key kind must not be empty"));
            }
            let identifier = match &segment.identifier {
                Some(id) => Some(id.canonical()?),
                None if i == last => None,
                None => {
                    return Err(CoreError::invalid_argument(format!(
                        "ancestor {} of key {key} has no identifier",
                        segment.kind
                    )))
                }
            };
            canonical.push(PathSegment::new(segment.kind.clone(), identifier));
        }
        Ok(Key::from_segments(
            key.namespace().map(str::to_string),
            canonical,
        ))
    }

    /// Canonicalizes `key` and assigns a fresh id if it is incomplete.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`KeyCodec::canonicalize`], or
    /// when the allocator has run out of ids.
    pub fn complete(key: &Key, ids: &mut IdAllocator) -> CoreResult<Key> {
        let canonical = Self::canonicalize(key)?;
        if canonical.is_complete() {
            return Ok(canonical);
        }
        let mut segments = canonical.segments().to_vec();
        if let Some(last) = segments.last_mut() {
            last.identifier = Some(Identifier::Id(ids.next_id()?));
        }
        Ok(Key::from_segments(
            canonical.namespace().map(str::to_string),
            segments,
        ))
    }

    /// Serializes `key` into its canonical form.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`KeyCodec::canonicalize`].
    pub fn serialize(key: &Key) -> CoreResult<CanonicalKey> {
        let canonical = Self::canonicalize(key)?;
        let mut encoder = CanonicalEncoder::with_capacity(16 * canonical.segments().len());

        let namespace = canonical
            .namespace()
            .map_or(Value::Null, |ns| Value::Text(ns.to_string()));
        encoder.encode(&namespace)?;
        let path_start = encoder.len();

        let mut prefix_end = path_start;
        for segment in canonical.segments() {
            encoder.encode(&Value::Text(segment.kind.clone()))?;
            prefix_end = encoder.len();
            let identifier = match &segment.identifier {
                Some(Identifier::Id(n)) => Value::Integer(*n),
                Some(Identifier::Name(name)) => Value::Text(name.clone()),
                // canonicalize() leaves no Int behind
                Some(Identifier::Int(text)) => Value::Text(text.clone()),
                None => Value::Null,
            };
            let incomplete = identifier.is_null();
            encoder.encode(&identifier)?;
            if !incomplete {
                prefix_end = encoder.len();
            }
        }

        Ok(CanonicalKey {
            bytes: encoder.into_bytes(),
            path_start,
            prefix_end,
        })
    }
}
