//! # dsim Core
//!
//! In-memory emulation of a hierarchical key-value document store.
//!
//! This crate provides:
//! - Keys with canonical serialization and id allocation
//! - An insertion-ordered entity table with insert/update/upsert/delete
//! - Kind-scoped queries with equality, range, and ancestor filters
//! - Transactions that queue writes and replay them on commit
//! - An async adapter for callers that expect deferred results
//!
//! ```
//! use dsim_core::{path, Config, Datastore, DatastoreBackend, EntityWrite, Properties, Value};
//!
//! let db = Datastore::with_config(Config::new().namespace("test"));
//! let mut props = Properties::new();
//! props.insert("name".into(), Value::from("ada"));
//!
//! let response = db
//!     .insert(vec![EntityWrite::new(db.key(path!["Person"])?, props)])?;
//! let key = response.keys().next().cloned().unwrap();
//!
//! let (people, _) = db.run_query(&db.create_query("Person").filter("name", "=", "ada"))?;
//! assert_eq!(people[0].key(), &key);
//! # Ok::<(), dsim_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocation;
mod backend;
mod config;
mod datastore;
#[cfg(feature = "deferred")]
mod deferred;
mod entity;
mod error;
pub mod external;
mod key;
mod mutation;
mod query;
mod transaction;
mod types;

pub use allocation::{AllocateIdsResponse, KeyMetadata, PartitionId, PathElement};
pub use backend::DatastoreBackend;
pub use config::{Config, DEFAULT_ID_BASE, NAMESPACE_ENV, PROJECT_ID_ENV};
pub use datastore::Datastore;
#[cfg(feature = "deferred")]
pub use deferred::DeferredDatastore;
pub use entity::{Entity, EntityTable, EntityWrite, MutationMode, Properties};
pub use error::{CoreError, CoreResult};
pub use key::{CanonicalKey, IdAllocator, Identifier, Key, KeyCodec, PathSegment};
pub use mutation::{CommitResponse, MutationResult, PendingMutation};
pub use query::{
    Filter, FilterOp, FilterValue, MoreResults, Query, QueryEngine, QueryInfo, KEY_PROPERTY,
};
pub use transaction::{Transaction, TransactionMode, TransactionOptions, TransactionState};
pub use types::{SequenceNumber, TransactionId};

pub use dsim_codec::{Timestamp, Value};
