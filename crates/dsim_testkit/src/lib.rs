//! # dsim Testkit
//!
//! Test utilities for dsim.
//!
//! This crate provides:
//! - A preconfigured test store and JSON seeding
//! - Property-based test generators using proptest
//! - A model-checking harness for cross-crate tests
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use dsim_testkit::prelude::*;
//!
//! with_test_store(|db| {
//!     let key = db.key(dsim_core::path!["Person", 1]).unwrap();
//!     assert_eq!(key.namespace(), Some("test"));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
