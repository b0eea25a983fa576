use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::{CellError, CellErrorKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The value of an evaluated expression or of a stored cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Empty, // For empty cells
    Error(CellError),
}

/// Coarse type tag of a [`LiteralValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Error,
    Empty,
}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::Text(s) => s.hash(state),
            LiteralValue::Boolean(b) => b.hash(state),
            LiteralValue::Empty => state.write_u8(0),
            LiteralValue::Error(e) => e.hash(state),
        }
    }
}

impl Eq for LiteralValue {}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{}", format_number(*n)),
            LiteralValue::Text(s) => write!(f, "{s}"),
            LiteralValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Empty => Ok(()),
            LiteralValue::Error(e) => write!(f, "{}", e.kind),
        }
    }
}

/// Shortest round-trip rendering; integral values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{n}")
}

impl LiteralValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            LiteralValue::Number(_) => ValueType::Number,
            LiteralValue::Text(_) => ValueType::String,
            LiteralValue::Boolean(_) => ValueType::Boolean,
            LiteralValue::Error(_) => ValueType::Error,
            LiteralValue::Empty => ValueType::Empty,
        }
    }

    pub fn error_kind(&self) -> Option<CellErrorKind> {
        match self {
            LiteralValue::Error(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LiteralValue::Error(_))
    }

    pub fn error(kind: CellErrorKind) -> Self {
        LiteralValue::Error(CellError::new(kind))
    }

    /// The text the grid shows for this value.
    pub fn display_text(&self) -> String {
        self.to_string()
    }

    /// Interpret user-typed literal text the way the grid does: numbers
    /// become numbers, `TRUE`/`FALSE` become booleans, an error token becomes
    /// that error, blank becomes empty, anything else stays text.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return LiteralValue::Empty;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return LiteralValue::Number(n);
            }
        }
        if trimmed.eq_ignore_ascii_case("TRUE") {
            return LiteralValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return LiteralValue::Boolean(false);
        }
        if let Some(err) = CellError::from_error_string(trimmed) {
            return LiteralValue::Error(err);
        }
        LiteralValue::Text(raw.to_string())
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::Text(s.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_grid_rendering() {
        assert_eq!(LiteralValue::Number(15.0).to_string(), "15");
        assert_eq!(LiteralValue::Number(1.5).to_string(), "1.5");
        assert_eq!(LiteralValue::Number(-0.0).to_string(), "0");
        assert_eq!(LiteralValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(LiteralValue::Empty.to_string(), "");
        assert_eq!(
            LiteralValue::error(CellErrorKind::Div).to_string(),
            "#DIV/0!"
        );
    }

    #[test]
    fn from_input_classifies_literals() {
        assert_eq!(LiteralValue::from_input("42"), LiteralValue::Number(42.0));
        assert_eq!(LiteralValue::from_input(" 2.5 "), LiteralValue::Number(2.5));
        assert_eq!(LiteralValue::from_input("true"), LiteralValue::Boolean(true));
        assert_eq!(LiteralValue::from_input(""), LiteralValue::Empty);
        assert_eq!(
            LiteralValue::from_input("#N/A"),
            LiteralValue::error(CellErrorKind::Na)
        );
        assert_eq!(
            LiteralValue::from_input("hello"),
            LiteralValue::Text("hello".into())
        );
        // "inf" parses as f64 but is not a grid number
        assert_eq!(LiteralValue::from_input("inf"), LiteralValue::Text("inf".into()));
    }
}
