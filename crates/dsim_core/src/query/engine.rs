//! Filter evaluation over the entity table.

use crate::entity::{Entity, EntityTable};
use crate::error::{CoreError, CoreResult};
use crate::key::{CanonicalKey, KeyCodec};
use crate::query::builder::validate_projection;
use crate::query::{Filter, FilterOp, FilterValue, Query, QueryInfo, KEY_PROPERTY};
use dsim_codec::Value;
use std::cmp::Ordering;
use tracing::{trace, warn};

type Candidate<'t> = (&'t CanonicalKey, &'t Entity);

/// Evaluates queries against an [`EntityTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine;

impl QueryEngine {
    /// Runs `query` and returns owned copies of the matching entities.
    ///
    /// Candidates are the entities of the query's kind and namespace, in
    /// table order. With no filters every candidate is returned. Otherwise
    /// each filter is evaluated on its own and its matches are appended, so
    /// an entity matching two filters appears twice.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if the query does not name exactly one
    /// kind, has an invalid projection, or carries a malformed ancestor key.
    pub fn run(table: &EntityTable, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)> {
        let kind = match query.kinds() {
            [kind] => kind.as_str(),
            kinds => {
                return Err(CoreError::invalid_argument(format!(
                    "query must name exactly one kind, got {}",
                    kinds.len()
                )))
            }
        };
        validate_projection(query.projection())?;
        if let Some(limit) = query.limit_value() {
            warn!(limit, "query limit is not enforced");
        }
        if !query.projection().is_empty() {
            warn!(fields = ?query.projection(), "query projection is not enforced");
        }

        let candidates: Vec<Candidate<'_>> = table
            .scan()
            .filter(|(_, e)| e.key().kind() == kind && e.key().namespace() == query.namespace())
            .collect();

        let mut matched: Vec<Entity> = Vec::new();
        if query.filters().is_empty() {
            matched.extend(candidates.iter().map(|(_, e)| (*e).clone()));
        } else {
            for filter in query.filters() {
                Self::apply(filter, &candidates, &mut matched)?;
            }
        }

        trace!(
            kind,
            candidates = candidates.len(),
            results = matched.len(),
            "query evaluated"
        );
        Ok((matched, QueryInfo::default()))
    }

    fn apply(
        filter: &Filter,
        candidates: &[Candidate<'_>],
        out: &mut Vec<Entity>,
    ) -> CoreResult<()> {
        match (&filter.op, &filter.value) {
            (FilterOp::HasAncestor, FilterValue::Key(ancestor))
                if filter.property == KEY_PROPERTY =>
            {
                let ancestor = KeyCodec::serialize(ancestor)?;
                out.extend(
                    candidates
                        .iter()
                        .filter(|(key, _)| key.is_descendant_of(&ancestor))
                        .map(|(_, e)| (*e).clone()),
                );
            }
            (
                FilterOp::Equal | FilterOp::GreaterThanOrEqual | FilterOp::LessThan,
                FilterValue::Value(operand),
            ) if filter.property != KEY_PROPERTY => {
                out.extend(
                    candidates
                        .iter()
                        .filter(|(_, e)| {
                            e.get(&filter.property)
                                .is_some_and(|v| Self::compare(&filter.op, v, operand))
                        })
                        .map(|(_, e)| (*e).clone()),
                );
            }
            _ => {
                warn!(
                    property = %filter.property,
                    op = %filter.op,
                    "unsupported filter ignored"
                );
            }
        }
        Ok(())
    }

    fn compare(op: &FilterOp, stored: &Value, operand: &Value) -> bool {
        match op {
            FilterOp::Equal => stored.loose_eq(operand),
            FilterOp::GreaterThanOrEqual => matches!(
                stored.loose_cmp(operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::LessThan => stored.loose_cmp(operand) == Some(Ordering::Less),
            _ => false,
        }
    }
}
