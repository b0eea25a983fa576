use gridcalc_common::{CellAddr, CellErrorKind, LiteralValue, ValueType};
use gridcalc_parse::parser::{ASTNode, ParserError};
use rustc_hash::FxHashMap;

/// Outcome of parsing a committed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaState {
    Parsed(ASTNode),
    Invalid(ParserError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Empty,
    Literal,
    Formula(FormulaState),
}

/// Everything the engine keeps for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// Text exactly as the user committed it.
    pub raw_input: String,
    pub kind: CellKind,
    pub cached_value: LiteralValue,
}

impl CellRecord {
    pub fn literal(raw_input: impl Into<String>, value: LiteralValue) -> Self {
        let kind = if matches!(value, LiteralValue::Empty) {
            CellKind::Empty
        } else {
            CellKind::Literal
        };
        Self {
            raw_input: raw_input.into(),
            kind,
            cached_value: value,
        }
    }

    pub fn formula(raw_input: impl Into<String>, state: FormulaState) -> Self {
        let cached_value = match &state {
            FormulaState::Parsed(_) => LiteralValue::Empty,
            FormulaState::Invalid(e) => LiteralValue::Error(e.clone().into()),
        };
        Self {
            raw_input: raw_input.into(),
            kind: CellKind::Formula(state),
            cached_value,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.cached_value.value_type()
    }

    pub fn error_kind(&self) -> Option<CellErrorKind> {
        self.cached_value.error_kind()
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.kind, CellKind::Formula(_))
    }

    /// The parsed tree, if this is a well-formed formula.
    pub fn ast(&self) -> Option<&ASTNode> {
        match &self.kind {
            CellKind::Formula(FormulaState::Parsed(ast)) => Some(ast),
            _ => None,
        }
    }
}

/// Sparse map of populated cells. Absent cells read as `Empty`.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    cells: FxHashMap<CellAddr, CellRecord>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, addr: CellAddr) -> Option<&CellRecord> {
        self.cells.get(&addr)
    }

    pub fn get_mut(&mut self, addr: CellAddr) -> Option<&mut CellRecord> {
        self.cells.get_mut(&addr)
    }

    pub fn insert(&mut self, addr: CellAddr, record: CellRecord) -> Option<CellRecord> {
        self.cells.insert(addr, record)
    }

    pub fn remove(&mut self, addr: CellAddr) -> Option<CellRecord> {
        self.cells.remove(&addr)
    }

    pub fn value(&self, addr: CellAddr) -> LiteralValue {
        self.cells
            .get(&addr)
            .map(|r| r.cached_value.clone())
            .unwrap_or(LiteralValue::Empty)
    }

    /// Records in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellAddr, &CellRecord)> {
        let mut entries: Vec<(CellAddr, &CellRecord)> =
            self.cells.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_parse::parse;

    #[test]
    fn invalid_formula_caches_parse_error() {
        let err = parse("=1+").unwrap_err();
        let rec = CellRecord::formula("=1+", FormulaState::Invalid(err));
        assert_eq!(rec.error_kind(), Some(CellErrorKind::Parse));
        assert!(rec.is_formula());
        assert!(rec.ast().is_none());
    }

    #[test]
    fn iteration_is_row_major() {
        let mut store = CellStore::new();
        for (s, n) in [("B2", 1.0), ("A2", 2.0), ("C1", 3.0)] {
            let addr = CellAddr::parse_a1(s).unwrap();
            store.insert(addr, CellRecord::literal(n.to_string(), LiteralValue::Number(n)));
        }
        let order: Vec<String> = store.iter().map(|(a, _)| a.to_a1()).collect();
        assert_eq!(order, vec!["C1", "A2", "B2"]);
        assert_eq!(store.value(CellAddr::new(9, 9)), LiteralValue::Empty);
    }
}
