//! Spreadsheet error values.
//!
//! - **`CellErrorKind`** : the closed set of error codes a cell can display
//! - **`CellError`**     : a kind plus an optional human explanation
//!
//! Errors are *values*: they are cached in cells and propagate through
//! formulas exactly like numbers do. The canonical display token is fixed
//! per kind and is what crosses the serialization boundary.

use std::{error::Error, fmt};

use crate::LiteralValue;

/// All recognised cell error codes.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display`
/// renders them exactly as the grid shows them (`#DIV/0!`, …).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellErrorKind {
    /// Malformed formula syntax.
    Parse,
    /// Unknown function identifier.
    Name,
    /// Type-incompatible operand.
    Value,
    /// Reference outside the grid, or a range used where a value is needed.
    Ref,
    /// Division by zero.
    Div,
    /// Numeric domain failure (non-finite result, `SQRT(-1)`, …).
    Num,
    /// A function's own failure, e.g. a missing argument.
    Na,
    /// The cell participates in a dependency cycle.
    Circular,
}

impl CellErrorKind {
    pub const ALL: [CellErrorKind; 8] = [
        Self::Parse,
        Self::Name,
        Self::Value,
        Self::Ref,
        Self::Div,
        Self::Num,
        Self::Na,
        Self::Circular,
    ];

    /// The canonical display token.
    pub fn token(self) -> &'static str {
        match self {
            Self::Parse => "#ERROR!",
            Self::Name => "#NAME?",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Div => "#DIV/0!",
            Self::Num => "#NUM!",
            Self::Na => "#N/A",
            Self::Circular => "#CIRCULAR!",
        }
    }

    /// Inverse of [`CellErrorKind::token`], case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.token().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CellErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The single error struct the parser and engine pass around.
///
/// Equality and hashing consider the kind only: two `#REF!` values are the
/// same displayed value no matter how they were produced.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellError {
    pub kind: CellErrorKind,
    pub message: Option<String>,
}

/* ───────────────────── Constructors & helpers ─────────────────────── */

impl From<CellErrorKind> for CellError {
    fn from(kind: CellErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

impl CellError {
    /// Basic constructor (no message).
    pub fn new(kind: CellErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn from_error_string(s: &str) -> Option<Self> {
        CellErrorKind::parse(s).map(Self::new)
    }

    pub fn parse_error<S: Into<String>>(msg: S) -> Self {
        Self::new(CellErrorKind::Parse).with_message(msg)
    }

    pub fn circular() -> Self {
        Self::new(CellErrorKind::Circular)
    }
}

impl PartialEq for CellError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for CellError {}

impl std::hash::Hash for CellError {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

/* ───────────────────────── Display / Error ────────────────────────── */

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl Error for CellError {}

impl From<CellError> for LiteralValue {
    fn from(error: CellError) -> Self {
        LiteralValue::Error(error)
    }
}

impl PartialEq<str> for CellErrorKind {
    fn eq(&self, other: &str) -> bool {
        self.token() == other
    }
}

impl PartialEq<&str> for CellError {
    fn eq(&self, other: &&str) -> bool {
        self.kind.token() == *other
    }
}
