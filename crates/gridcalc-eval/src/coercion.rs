//! Value coercion shared by operators and builtins.
//!
//! Numeric context: numbers pass through, booleans are 0/1, empty is 0 and
//! trimmed numeric-looking text parses; any other text is `#VALUE!`.
//! Text context: the value's display string. Errors never coerce; callers
//! propagate them before coercing.

use std::cmp::Ordering;

use gridcalc_common::{CellError, CellErrorKind, LiteralValue, format_number};

pub fn to_number(value: &LiteralValue) -> Result<f64, CellError> {
    match value {
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Empty => Ok(0.0),
        LiteralValue::Text(s) => parse_numeric_text(s).ok_or_else(|| {
            CellError::new(CellErrorKind::Value)
                .with_message(format!("Cannot convert '{s}' to number"))
        }),
        LiteralValue::Error(e) => Err(e.clone()),
    }
}

/// Trimmed finite decimal text, or `None`.
pub fn parse_numeric_text(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn to_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::Text(s) => s.clone(),
        LiteralValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        LiteralValue::Empty => String::new(),
        LiteralValue::Error(e) => e.kind.token().to_string(),
    }
}

/// Truthiness for logical functions: numbers are non-zero, empty is FALSE,
/// text `TRUE`/`FALSE` is accepted, other text is `#VALUE!`.
pub fn to_logical(value: &LiteralValue) -> Result<bool, CellError> {
    match value {
        LiteralValue::Boolean(b) => Ok(*b),
        LiteralValue::Number(n) => Ok(*n != 0.0),
        LiteralValue::Empty => Ok(false),
        LiteralValue::Text(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("TRUE") {
                Ok(true)
            } else if t.eq_ignore_ascii_case("FALSE") {
                Ok(false)
            } else {
                Err(CellError::new(CellErrorKind::Value)
                    .with_message(format!("Cannot convert '{s}' to logical")))
            }
        }
        LiteralValue::Error(e) => Err(e.clone()),
    }
}

/// Map non-finite arithmetic results to `#NUM!`.
pub fn sanitize_numeric(n: f64) -> Result<f64, CellError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(CellError::new(CellErrorKind::Num).with_message("Result is not a finite number"))
    }
}

/// Rank of a type in the cross-type order `Number < Text < Boolean`.
fn type_rank(value: &LiteralValue) -> u8 {
    match value {
        LiteralValue::Number(_) => 0,
        LiteralValue::Text(_) => 1,
        LiteralValue::Boolean(_) => 2,
        LiteralValue::Empty | LiteralValue::Error(_) => 3,
    }
}

/// The value an empty operand stands for when compared against `other`.
fn empty_as(other: &LiteralValue) -> LiteralValue {
    match other {
        LiteralValue::Text(_) => LiteralValue::Text(String::new()),
        LiteralValue::Boolean(_) => LiteralValue::Boolean(false),
        _ => LiteralValue::Number(0.0),
    }
}

/// Total order used by comparison operators. Neither side may be an error.
///
/// Same-type values compare directly (text case-insensitively, `FALSE < TRUE`);
/// across types `Number < Text < Boolean`. Empty takes the other side's type.
pub fn compare_values(left: &LiteralValue, right: &LiteralValue) -> Ordering {
    match (left, right) {
        (LiteralValue::Empty, LiteralValue::Empty) => Ordering::Equal,
        (LiteralValue::Empty, r) => compare_values(&empty_as(r), r),
        (l, LiteralValue::Empty) => compare_values(l, &empty_as(l)),
        (LiteralValue::Number(a), LiteralValue::Number(b)) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (LiteralValue::Text(a), LiteralValue::Text(b)) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a.cmp(b),
        (l, r) => type_rank(l).cmp(&type_rank(r)),
    }
}
