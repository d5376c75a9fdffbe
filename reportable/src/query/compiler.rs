//! Filter to predicate compilation
//!
//! Every comparator has exactly one arm below; adding a comparator without
//! extending this match is a compile error.

use serde_json::Value;

use super::error::CompileError;
use super::predicate::{CompareOp, LikeAnchor, Predicate};
use super::source::QuerySource;
use crate::filter::{Comparator, Filter, FilterCollection};

/// Translate a single filter
pub fn compile_predicate(filter: &Filter) -> Result<Predicate, CompileError> {
    let column = filter.column().to_string();
    let comparator = filter.comparator();

    let compare = |op: CompareOp| -> Result<Predicate, CompileError> {
        Ok(Predicate::Compare {
            column: column.clone(),
            op,
            value: scalar(filter)?,
        })
    };
    let like = |anchor: LikeAnchor, negated: bool| -> Result<Predicate, CompileError> {
        Ok(Predicate::Like {
            column: column.clone(),
            needle: needle(filter)?,
            anchor,
            negated,
        })
    };
    let membership = |negated: bool| -> Result<Predicate, CompileError> {
        let values = filter
            .list()
            .ok_or_else(|| invalid(filter, "expected a list"))?
            .to_vec();
        Ok(Predicate::In {
            column: column.clone(),
            values,
            negated,
        })
    };

    match comparator {
        Comparator::Equals => compare(CompareOp::Eq),
        Comparator::NotEquals => compare(CompareOp::NotEq),
        Comparator::Gt => compare(CompareOp::Gt),
        Comparator::Gte => compare(CompareOp::Gte),
        Comparator::Lt => compare(CompareOp::Lt),
        Comparator::Lte => compare(CompareOp::Lte),
        Comparator::Contains => like(LikeAnchor::Contains, false),
        Comparator::NotContains => like(LikeAnchor::Contains, true),
        Comparator::StartsWith => like(LikeAnchor::StartsWith, false),
        Comparator::EndsWith => like(LikeAnchor::EndsWith, false),
        Comparator::In => membership(false),
        Comparator::NotIn => membership(true),
        Comparator::Between => {
            let (min, max) = filter
                .range()
                .ok_or_else(|| invalid(filter, "expected [min, max]"))?;
            Ok(Predicate::Between {
                column,
                min: min.clone(),
                max: max.clone(),
            })
        }
        Comparator::IsNull => Ok(Predicate::Null {
            column,
            negated: false,
        }),
        Comparator::IsNotNull => Ok(Predicate::Null {
            column,
            negated: true,
        }),
    }
}

/// Apply every filter to `source`, in collection order
///
/// Stops at the first filter that cannot be translated. An empty collection
/// leaves the source untouched.
pub fn compile(
    source: &mut dyn QuerySource,
    filters: &FilterCollection,
) -> Result<(), CompileError> {
    for filter in filters {
        let predicate = compile_predicate(filter)?;
        source.apply_predicate(predicate)?;
    }
    tracing::trace!(
        backend = source.backend(),
        filters = filters.len(),
        "Filters compiled"
    );
    Ok(())
}

fn scalar(filter: &Filter) -> Result<Value, CompileError> {
    match filter.value() {
        Some(value) if !value.is_array() && !value.is_object() && !value.is_null() => {
            Ok(value.clone())
        }
        _ => Err(invalid(filter, "expected a scalar")),
    }
}

fn needle(filter: &Filter) -> Result<String, CompileError> {
    match filter.value() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(if *b { "1" } else { "0" }.to_string()),
        _ => Err(invalid(filter, "expected text to match")),
    }
}

fn invalid(filter: &Filter, reason: &str) -> CompileError {
    CompileError::InvalidOperand {
        column: filter.column().to_string(),
        comparator: filter.comparator().as_str().to_string(),
        reason: reason.to_string(),
    }
}
