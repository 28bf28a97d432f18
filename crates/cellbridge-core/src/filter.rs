//! Server-side scan filters and per-request filter templates.
//!
//! A [`Filter`] is evaluated by the store against each candidate row. An
//! endpoint is configured with [`FilterTemplate`]s; model-aware templates
//! carry per-request state and are never shared between scans. Instead,
//! each scan calls [`ModelAwareFilter::clone_and_bind`] to get a fresh
//! [`Filter`] bound to that scan's row template.
//!
//! ## Binding Flow
//!
//! 1. Endpoint is configured with static and model-aware templates
//! 2. Per scan, [`bind_templates`] binds every model-aware template
//! 3. The bound filters are combined with [`FilterListOperator::MustPassAll`]
//! 4. Static templates are not forwarded

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::client::KeyValue;
use crate::convert::{self, ConversionError};
use crate::model::Row;

/// Comparison applied as `<cell value> op <operand>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl CompareOp {
    /// Whether an ordering of `<cell value>` vs `<operand>` satisfies this op.
    #[must_use]
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::Greater => ordering == Ordering::Greater,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
        };
        f.write_str(s)
    }
}

/// How a [`Filter::List`] combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterListOperator {
    /// Logical AND
    MustPassAll,
    /// Logical OR
    MustPassOne,
}

/// A filter evaluated by the store per candidate row.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Compares the newest value of one column against an operand.
    SingleColumnValue {
        /// Column family
        family: Bytes,
        /// Column qualifier
        qualifier: Bytes,
        /// Comparison
        op: CompareOp,
        /// Operand bytes, compared lexicographically
        operand: Bytes,
        /// Reject rows that lack the column (otherwise they pass)
        filter_if_missing: bool,
    },
    /// Row key starts with the given bytes.
    Prefix(Bytes),
    /// Combination of filters. An empty list passes every row.
    List {
        /// Combination operator
        operator: FilterListOperator,
        /// Member filters
        filters: Vec<Filter>,
    },
}

impl Filter {
    /// `family:qualifier op operand`, passing rows that lack the column.
    #[must_use]
    pub fn single_column_value(family: &str, qualifier: &str, op: CompareOp, operand: Bytes) -> Self {
        Self::SingleColumnValue {
            family: convert::field_bytes(family),
            qualifier: convert::field_bytes(qualifier),
            op,
            operand,
            filter_if_missing: false,
        }
    }

    /// AND of `filters`.
    #[must_use]
    pub fn all(filters: Vec<Filter>) -> Self {
        Self::List {
            operator: FilterListOperator::MustPassAll,
            filters,
        }
    }

    /// OR of `filters`.
    #[must_use]
    pub fn any(filters: Vec<Filter>) -> Self {
        Self::List {
            operator: FilterListOperator::MustPassOne,
            filters,
        }
    }

    /// Evaluates the filter against a row key and its candidate cells.
    #[must_use]
    pub fn matches(&self, row: &[u8], cells: &[KeyValue]) -> bool {
        match self {
            Self::SingleColumnValue {
                family,
                qualifier,
                op,
                operand,
                filter_if_missing,
            } => {
                let latest = cells
                    .iter()
                    .filter(|kv| kv.matches_column(family, qualifier))
                    .max_by_key(|kv| kv.timestamp);
                match latest {
                    Some(kv) => op.accepts(kv.value.as_ref().cmp(operand.as_ref())),
                    None => !filter_if_missing,
                }
            }
            Self::Prefix(prefix) => row.starts_with(prefix),
            Self::List { operator, filters } => {
                if filters.is_empty() {
                    return true;
                }
                match operator {
                    FilterListOperator::MustPassAll => filters.iter().all(|f| f.matches(row, cells)),
                    FilterListOperator::MustPassOne => filters.iter().any(|f| f.matches(row, cells)),
                }
            }
        }
    }
}

/// A filter that must be re-instantiated and bound to each request's row
/// template.
pub trait ModelAwareFilter: Send + Sync + fmt::Debug {
    /// Produces a fresh filter bound to `template`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if a template value cannot be encoded.
    fn clone_and_bind(&self, template: &Row) -> Result<Filter, ConversionError>;
}

/// A filter configured on an endpoint.
#[derive(Debug, Clone)]
pub enum FilterTemplate {
    /// A fixed filter.
    Static(Filter),
    /// A factory bound per request.
    ModelAware(Arc<dyn ModelAwareFilter>),
}

impl FilterTemplate {
    /// Wraps a model-aware filter.
    pub fn model_aware(filter: impl ModelAwareFilter + 'static) -> Self {
        Self::ModelAware(Arc::new(filter))
    }
}

/// Binds the model-aware templates to `template` and ANDs the clones.
///
/// Returns `None` when no templates are configured. Static templates are
/// skipped, so a non-empty template list with no model-aware entries
/// yields an empty (pass-all) list.
///
/// # Errors
///
/// Propagates the first binding failure.
pub fn bind_templates(
    templates: &[FilterTemplate],
    template: &Row,
) -> Result<Option<Filter>, ConversionError> {
    if templates.is_empty() {
        return Ok(None);
    }
    let clones = templates
        .iter()
        .filter_map(|t| match t {
            FilterTemplate::ModelAware(factory) => Some(factory.clone_and_bind(template)),
            FilterTemplate::Static(_) => None,
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Filter::all(clones)))
}

/// Matches rows whose columns equal every valued cell of the template.
///
/// Template cells without a family, qualifier or value do not constrain
/// the scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnMatchingFilter;

impl ModelAwareFilter for ColumnMatchingFilter {
    fn clone_and_bind(&self, template: &Row) -> Result<Filter, ConversionError> {
        let filters = template
            .cells()
            .iter()
            .filter_map(|cell| {
                let family = cell.family.as_deref()?;
                let qualifier = cell.qualifier.as_deref()?;
                let value = cell.value.as_ref()?;
                Some(Filter::single_column_value(
                    family,
                    qualifier,
                    CompareOp::Equal,
                    convert::to_bytes(value),
                ))
            })
            .collect();
        Ok(Filter::all(filters))
    }
}
