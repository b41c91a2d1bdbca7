//! Query description and builder.

use crate::error::{CoreError, CoreResult};
use crate::key::Key;
use dsim_codec::{Timestamp, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-property naming the entity key in filters and projections.
pub const KEY_PROPERTY: &str = "__key__";

/// Comparison operator of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    /// `=`
    Equal,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessThanOrEqual,
    /// `!=`
    NotEqual,
    /// `IN`
    In,
    /// `NOT_IN`
    NotIn,
    /// `HAS_ANCESTOR`
    HasAncestor,
    /// Any other operator text.
    Other(String),
}

impl FilterOp {
    /// Operator text as written in queries.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Equal => "=",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::LessThan => "<",
            FilterOp::GreaterThan => ">",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::NotEqual => "!=",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT_IN",
            FilterOp::HasAncestor => "HAS_ANCESTOR",
            FilterOp::Other(op) => op,
        }
    }
}

impl From<&str> for FilterOp {
    fn from(op: &str) -> Self {
        match op {
            "=" => FilterOp::Equal,
            ">=" => FilterOp::GreaterThanOrEqual,
            "<" => FilterOp::LessThan,
            ">" => FilterOp::GreaterThan,
            "<=" => FilterOp::LessThanOrEqual,
            "!=" => FilterOp::NotEqual,
            "IN" => FilterOp::In,
            "NOT_IN" => FilterOp::NotIn,
            "HAS_ANCESTOR" => FilterOp::HasAncestor,
            other => FilterOp::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// A property value.
    Value(Value),
    /// A key, used by ancestor filters.
    Key(Key),
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Value(value)
    }
}

impl From<Key> for FilterValue {
    fn from(key: Key) -> Self {
        FilterValue::Key(key)
    }
}

macro_rules! filter_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Value(Value::from(value))
                }
            }
        )*
    };
}

filter_value_from!(bool, i64, i32, f64, &str, String, Timestamp);

/// One `property op value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Property name, or [`KEY_PROPERTY`].
    pub property: String,
    /// Operator.
    pub op: FilterOp,
    /// Operand.
    pub value: FilterValue,
}

/// A kind- and namespace-scoped query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    namespace: Option<String>,
    kinds: Vec<String>,
    filters: Vec<Filter>,
    limit: Option<usize>,
    select: Vec<String>,
}

impl Query {
    /// Creates a query over `kind` with no namespace.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::default().kind(kind)
    }

    /// Creates a query over `kind` in `namespace`.
    pub fn in_namespace(namespace: Option<String>, kind: impl Into<String>) -> Self {
        Self {
            namespace,
            ..Self::new(kind)
        }
    }

    /// Adds a kind. Queries must name exactly one kind to run.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(
        mut self,
        property: impl Into<String>,
        op: impl Into<FilterOp>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.filters.push(Filter {
            property: property.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Restricts results to strict descendants of `ancestor`.
    #[must_use]
    pub fn has_ancestor(self, ancestor: Key) -> Self {
        self.filter(KEY_PROPERTY, FilterOp::HasAncestor, ancestor)
    }

    /// Sets a result limit. Recorded but not enforced.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets a projection. Recorded but not enforced.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if [`KEY_PROPERTY`] is mixed with other
    /// fields.
    pub fn select<I, S>(mut self, fields: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        validate_projection(&fields)?;
        self.select = fields;
        Ok(self)
    }

    /// Namespace the query is scoped to.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Kinds named by the query.
    #[must_use]
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    /// Filters in evaluation order.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// The recorded limit.
    #[must_use]
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// The recorded projection.
    #[must_use]
    pub fn projection(&self) -> &[String] {
        &self.select
    }
}

/// Checks that a projection does not mix [`KEY_PROPERTY`] with other fields.
pub(crate) fn validate_projection(fields: &[String]) -> CoreResult<()> {
    if fields.len() > 1 && fields.iter().any(|f| f == KEY_PROPERTY) {
        return Err(CoreError::invalid_argument(
            "Cannot mix __key__ select with other fields",
        ));
    }
    Ok(())
}

/// Whether more results exist past the returned batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoreResults {
    /// The batch may be followed by more results.
    NotFinished,
    /// The limit was reached; more results may exist.
    MoreResultsAfterLimit,
    /// The end cursor was reached.
    MoreResultsAfterCursor,
    /// No further results.
    NoMoreResults,
}

impl MoreResults {
    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MoreResults::NotFinished => "NOT_FINISHED",
            MoreResults::MoreResultsAfterLimit => "MORE_RESULTS_AFTER_LIMIT",
            MoreResults::MoreResultsAfterCursor => "MORE_RESULTS_AFTER_CURSOR",
            MoreResults::NoMoreResults => "NO_MORE_RESULTS",
        }
    }
}

impl fmt::Display for MoreResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Continuation metadata returned with query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    /// Continuation state.
    pub more_results: MoreResults,
    /// Cursor after the last result; never produced in memory.
    pub end_cursor: Option<String>,
}

impl Default for QueryInfo {
    fn default() -> Self {
        Self {
            more_results: MoreResults::MoreResultsAfterLimit,
            end_cursor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_parse() {
        assert_eq!(FilterOp::from("="), FilterOp::Equal);
        assert_eq!(FilterOp::from(">="), FilterOp::GreaterThanOrEqual);
        assert_eq!(FilterOp::from("HAS_ANCESTOR"), FilterOp::HasAncestor);
        assert_eq!(FilterOp::from("~"), FilterOp::Other("~".into()));
        assert_eq!(FilterOp::from("~").to_string(), "~");
    }

    #[test]
    fn builder_collects_filters() {
        let query = Query::in_namespace(Some("test".into()), "Person")
            .filter("age", ">=", 18)
            .filter("name", FilterOp::Equal, "ada")
            .has_ancestor(Key::new("Team", 1))
            .limit(10);

        assert_eq!(query.namespace(), Some("test"));
        assert_eq!(query.kinds(), ["Person".to_string()]);
        assert_eq!(query.filters().len(), 3);
        assert_eq!(query.filters()[2].property, KEY_PROPERTY);
        assert_eq!(query.limit_value(), Some(10));
    }

    #[test]
    fn select_rejects_mixed_key_projection() {
        let err = Query::new("Person")
            .select(["__key__", "name"])
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot mix __key__ select with other fields");

        assert!(Query::new("Person").select(["__key__"]).is_ok());
        assert!(Query::new("Person").select(["name", "age"]).is_ok());
    }

    #[test]
    fn query_info_defaults_to_after_limit() {
        let info = QueryInfo::default();
        assert_eq!(info.more_results.as_str(), "MORE_RESULTS_AFTER_LIMIT");
        assert!(info.end_cursor.is_none());
    }
}
