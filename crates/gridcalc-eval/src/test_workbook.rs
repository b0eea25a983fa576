//! Lightweight in-memory grid for interpreter and function tests.
use std::sync::Arc;

use gridcalc_common::{CellAddr, GridBounds, LiteralValue};
use gridcalc_parse::parse;
use rustc_hash::FxHashMap;

use crate::function::Function;
use crate::function_registry::FunctionRegistry;
use crate::interpreter::Interpreter;
use crate::traits::{FunctionProvider, ReferenceResolver};

type V = LiteralValue;

pub struct TestWorkbook {
    cells: FxHashMap<CellAddr, V>,
    bounds: GridBounds,
    fns: FunctionRegistry,
}

impl Default for TestWorkbook {
    fn default() -> Self {
        Self {
            cells: FxHashMap::default(),
            bounds: GridBounds::default(),
            fns: FunctionRegistry::with_builtins(),
        }
    }
}

impl TestWorkbook {
    /* ─────────────── constructors ─────────────── */
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, bounds: GridBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /* ─────────────── cell helpers ─────────────── */
    pub fn with_cell(mut self, row: u32, col: u32, v: V) -> Self {
        self.cells.insert(CellAddr::new(row, col), v);
        self
    }

    pub fn with_cell_a1(self, a1: &str, v: V) -> Self {
        let addr = CellAddr::parse_a1(a1).expect("bad A1 ref in with_cell_a1");
        self.with_cell(addr.row, addr.col, v)
    }

    /* ─────────────── functions ─────────────── */
    pub fn with_function(mut self, f: Arc<dyn Function>) -> Self {
        self.fns.register(f);
        self
    }

    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(self)
    }

    /// Parse and evaluate; a parse failure reads as its `#ERROR!` value.
    pub fn eval(&self, formula: &str) -> V {
        match parse(formula) {
            Ok(ast) => self.interpreter().evaluate_to_value(&ast),
            Err(e) => LiteralValue::Error(e.into()),
        }
    }
}

impl ReferenceResolver for TestWorkbook {
    fn cell_value(&self, addr: CellAddr) -> V {
        self.cells.get(&addr).cloned().unwrap_or(LiteralValue::Empty)
    }

    fn bounds(&self) -> GridBounds {
        self.bounds
    }
}

impl FunctionProvider for TestWorkbook {
    fn get_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.fns.get(name)
    }
}
