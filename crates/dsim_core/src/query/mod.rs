//! Queries and their evaluation.

mod builder;
mod engine;

pub use builder::{
    Filter, FilterOp, FilterValue, MoreResults, Query, QueryInfo, KEY_PROPERTY,
};
pub use engine::QueryEngine;
