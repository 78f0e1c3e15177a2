// -------------------------
// Type inference + casts
// -------------------------

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ppl_plan::{BinOp, DataType, Expr, Value};
use std::net::IpAddr;

use crate::error::AnalysisError;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn numeric_rank(dt: &DataType) -> Option<u8> {
    Some(match dt {
        DataType::Int8 => 1,
        DataType::Int16 => 2,
        DataType::Int32 => 3,
        DataType::Int64 => 4,
        DataType::Float32 => 5,
        DataType::Float64 | DataType::Decimal { .. } => 6,
        _ => return None,
    })
}

fn wider_numeric(a: &DataType, b: &DataType) -> Option<DataType> {
    let ra = numeric_rank(a)?;
    let rb = numeric_rank(b)?;
    let wider = if ra >= rb { a } else { b };
    // Decimal mixes at double precision
    match wider {
        DataType::Decimal { .. } if a != b => Some(DataType::Float64),
        other => Some(other.clone()),
    }
}

/// Common type two operands are compared at, `None` when incomparable
pub(crate) fn comparison_type(left: &DataType, right: &DataType) -> Option<DataType> {
    match (left, right) {
        (DataType::Null, other) | (other, DataType::Null) => Some(other.clone()),
        (l, r) if l == r => Some(l.clone()),
        (l, r) if l.is_numeric() && r.is_numeric() => wider_numeric(l, r),
        (DataType::String, target @ (DataType::Date | DataType::Timestamp | DataType::Ip))
        | (target @ (DataType::Date | DataType::Timestamp | DataType::Ip), DataType::String) => {
            Some(target.clone())
        }
        (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => {
            Some(DataType::Timestamp)
        }
        _ => None,
    }
}

/// Cast `expr` from `from` to `to`; string literals headed for a temporal or
/// ip type are validated first.
pub(crate) fn coerce(expr: Expr, from: &DataType, to: &DataType) -> Result<Expr, AnalysisError> {
    if from == to || *from == DataType::Null {
        return Ok(expr);
    }
    if let Expr::Literal { value: Value::String(text) } = &expr {
        validate_string_literal(text, to)?;
    }
    Ok(Expr::Cast {
        expr: Box::new(expr),
        to: to.clone(),
    })
}

pub(crate) fn validate_string_literal(text: &str, to: &DataType) -> Result<(), AnalysisError> {
    let valid = match to {
        DataType::Date => parse_date(text),
        DataType::Timestamp => parse_timestamp(text),
        DataType::Ip => text.parse::<IpAddr>().is_ok(),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::InvalidLiteral(format!("'{text}' is not a valid {to}")))
    }
}

fn parse_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn parse_timestamp(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || TIMESTAMP_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
        || parse_date(text)
}

pub(crate) fn coerce_for_compare(
    left: Expr,
    ldt: DataType,
    right: Expr,
    rdt: DataType,
) -> Result<(Expr, Expr), AnalysisError> {
    let target = comparison_type(&ldt, &rdt)
        .ok_or_else(|| AnalysisError::TypeMismatch(format!("cannot compare {ldt} with {rdt}")))?;
    Ok((coerce(left, &ldt, &target)?, coerce(right, &rdt, &target)?))
}

/// Arithmetic result; `/` always divides in double precision and
/// temporal values shift by intervals
pub(crate) fn coerce_for_arith(
    op: BinOp,
    left: Expr,
    ldt: DataType,
    right: Expr,
    rdt: DataType,
) -> Result<(Expr, Expr, DataType), AnalysisError> {
    if matches!(op, BinOp::Add | BinOp::Sub) && ldt.is_temporal() && rdt == DataType::Interval {
        return Ok((left, right, ldt));
    }
    if op == BinOp::Add && ldt == DataType::Interval && rdt.is_temporal() {
        return Ok((left, right, rdt));
    }

    let numeric_or_null = |dt: &DataType| dt.is_numeric() || *dt == DataType::Null;
    if !numeric_or_null(&ldt) || !numeric_or_null(&rdt) {
        return Err(AnalysisError::TypeMismatch(format!(
            "arithmetic '{}' requires numeric operands, got {ldt} and {rdt}",
            op.symbol()
        )));
    }

    let target = if op == BinOp::Div {
        DataType::Float64
    } else {
        match (&ldt, &rdt) {
            (DataType::Null, DataType::Null) => DataType::Int64,
            (DataType::Null, other) | (other, DataType::Null) => other.clone(),
            (l, r) => wider_numeric(l, r)
                .ok_or_else(|| AnalysisError::TypeMismatch("failed numeric widening".to_string()))?,
        }
    };

    Ok((coerce(left, &ldt, &target)?, coerce(right, &rdt, &target)?, target))
}

pub(crate) fn ensure_bool(dt: &DataType, context: &str) -> Result<(), AnalysisError> {
    match dt {
        DataType::Bool | DataType::Null => Ok(()),
        other => Err(AnalysisError::TypeMismatch(format!(
            "{context} must be boolean, got {other}"
        ))),
    }
}
