//! Keys, key canonicalization, and id allocation.

mod codec;
mod id;
mod path;

pub use codec::{CanonicalKey, KeyCodec};
pub use id::IdAllocator;
pub use path::{Identifier, Key, PathSegment};
