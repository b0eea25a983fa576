//! Cell addresses and grid bounds.
//!
//! `CellAddr` is a plain 1-based (row, column) pair. Column letters follow
//! the usual bijective base-26 scheme (`A`..`Z`, `AA`..`ZZ`, ...).

use core::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

/// Precomputed letters for columns 1..=702 (`A` to `ZZ`).
static COLUMN_LOOKUP: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols = Vec::with_capacity(702);
    for c in b'A'..=b'Z' {
        cols.push(String::from(c as char));
    }
    for c1 in b'A'..=b'Z' {
        for c2 in b'A'..=b'Z' {
            cols.push(format!("{}{}", c1 as char, c2 as char));
        }
    }
    cols
});

/// Convert a 1-based column number to its letters. `0` yields an empty string.
pub fn column_to_letters(col: u32) -> String {
    if col > 0 && col <= 702 {
        return COLUMN_LOOKUP[(col - 1) as usize].clone();
    }
    let mut num = col;
    let mut result = String::with_capacity(3);
    while num > 0 {
        num -= 1;
        result.insert(0, ((num % 26) as u8 + b'A') as char);
        num /= 26;
    }
    result
}

/// Convert column letters (any case) to a 1-based column number.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut result = 0u32;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        result = result
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A' + 1) as u32)?;
    }
    Some(result)
}

/// Errors returned when reading an A1-style cell identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddrParseError {
    Empty,
    MissingColumn(String),
    MissingRow(String),
    Malformed(String),
    Overflow(String),
}

impl fmt::Display for AddrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrParseError::Empty => write!(f, "empty cell identifier"),
            AddrParseError::MissingColumn(s) => write!(f, "cell identifier {s:?} has no column"),
            AddrParseError::MissingRow(s) => write!(f, "cell identifier {s:?} has no row"),
            AddrParseError::Malformed(s) => write!(f, "malformed cell identifier {s:?}"),
            AddrParseError::Overflow(s) => write!(f, "cell identifier {s:?} is too large"),
        }
    }
}

impl std::error::Error for AddrParseError {}

/// A 1-based cell position.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 identifier. `$` markers are ignored; letters may be any case.
    pub fn parse_a1(s: &str) -> Result<Self, AddrParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AddrParseError::Empty);
        }
        let cleaned: String = trimmed.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() {
            return Err(AddrParseError::MissingColumn(s.to_string()));
        }
        if digits.is_empty() {
            return Err(AddrParseError::MissingRow(s.to_string()));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddrParseError::Malformed(s.to_string()));
        }
        let col = letters_to_column(letters).ok_or_else(|| AddrParseError::Overflow(s.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| AddrParseError::Overflow(s.to_string()))?;
        if row == 0 {
            return Err(AddrParseError::Malformed(s.to_string()));
        }
        Ok(Self { row, col })
    }

    /// Shift by a signed delta; `None` when either axis drops below 1.
    pub fn offset(self, row_delta: i64, col_delta: i64) -> Option<Self> {
        let row = i64::from(self.row) + row_delta;
        let col = i64::from(self.col) + col_delta;
        if row < 1 || col < 1 || row > i64::from(u32::MAX) || col > i64::from(u32::MAX) {
            return None;
        }
        Some(Self::new(row as u32, col as u32))
    }

    pub fn to_a1(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CellAddr::parse_a1(&s).map_err(serde::de::Error::custom)
    }
}

/// Inclusive upper bounds of the addressable grid (rows and columns start at 1).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GridBounds {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl GridBounds {
    pub const fn new(max_rows: u32, max_cols: u32) -> Self {
        Self { max_rows, max_cols }
    }

    #[inline]
    pub fn contains_row(&self, row: i64) -> bool {
        row >= 1 && row <= i64::from(self.max_rows)
    }

    #[inline]
    pub fn contains_col(&self, col: i64) -> bool {
        col >= 1 && col <= i64::from(self.max_cols)
    }

    #[inline]
    pub fn contains(&self, addr: CellAddr) -> bool {
        self.contains_row(i64::from(addr.row)) && self.contains_col(i64::from(addr.col))
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new(100, 26)
    }
}
