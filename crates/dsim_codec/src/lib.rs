//! # dsim Codec
//!
//! Property values and canonical encoding for dsim.
//!
//! This crate provides:
//! - [`Value`], the dynamic property value stored on entities
//! - [`Timestamp`], the date/time type used by values and mutation results
//! - A canonical CBOR item encoder, used to turn keys into comparable bytes
//!
//! ## Usage
//!
//! ```
//! use dsim_codec::{CanonicalEncoder, Value};
//!
//! let mut parent = CanonicalEncoder::new();
//! parent.encode(&Value::from("Person")).unwrap();
//! parent.encode(&Value::Integer(1)).unwrap();
//!
//! let mut child = CanonicalEncoder::new();
//! for item in [
//!     Value::from("Person"),
//!     Value::Integer(1),
//!     Value::from("Pet"),
//!     Value::from("rex"),
//! ] {
//!     child.encode(&item).unwrap();
//! }
//! assert!(child.as_bytes().starts_with(parent.as_bytes()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoder;
mod error;
mod value;

pub use encoder::CanonicalEncoder;
pub use error::{CodecError, CodecResult};
pub use value::{Timestamp, Value};
