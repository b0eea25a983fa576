use std::collections::BTreeMap;
use std::sync::Arc;

use gridcalc_common::{AddrParseError, CellAddr, CellError, GridBounds, LiteralValue};
use gridcalc_parse::parser::parse;
use gridcalc_parse::pretty::render_formula;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::EvalConfig;
use super::cell_store::{CellKind, CellRecord, CellStore, FormulaState};
use super::editor::ReferenceAdjuster;
use super::graph::DependencyGraph;
use super::scheduler::Scheduler;
use super::vertex::VertexId;
use crate::function::Function;
use crate::function_registry::FunctionRegistry;
use crate::interpreter::Interpreter;
use crate::traits::{FunctionProvider, ReferenceResolver};

/// Cells whose value changed in one request, in row-major order.
pub type Updates = BTreeMap<CellAddr, LiteralValue>;

/// Request-level failures. Cell-level problems are values, never this.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid cell id '{id}': {source}")]
    InvalidCellId {
        id: String,
        #[source]
        source: AddrParseError,
    },
    #[error("cell {addr} is outside the grid ({max_cols} columns x {max_rows} rows)")]
    OutOfBounds {
        addr: CellAddr,
        max_rows: u32,
        max_cols: u32,
    },
    #[error("internal engine fault: {0}")]
    Internal(String),
}

/// What a caller commits to a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    Formula(String),
    Value(LiteralValue),
}

impl CellInput {
    /// Text starting with `=` is a formula; anything else is read as a literal.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim_start().starts_with('=') {
            CellInput::Formula(raw.trim_start().to_string())
        } else {
            CellInput::Value(LiteralValue::from_input(raw))
        }
    }
}

/// Bookkeeping of the most recent recalculation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcPass {
    /// Formula cells in the order they were evaluated.
    pub order: Vec<CellAddr>,
    /// Cells found on reference cycles, one entry per strongly connected component.
    pub cycles: Vec<Vec<CellAddr>>,
}

enum Checkpoint {
    Cell {
        addr: CellAddr,
        record: Option<CellRecord>,
        precedents: Vec<CellAddr>,
    },
    Full {
        store: CellStore,
        graph: DependencyGraph,
    },
}

/// Single-owner formula engine: cell store, dependency graph and registry.
///
/// Every mutation runs to completion, including recalculation of all
/// transitive dependents, before it returns.
pub struct Engine {
    config: EvalConfig,
    registry: FunctionRegistry,
    store: CellStore,
    graph: DependencyGraph,
    last_pass: RecalcPass,
    checkpoint: Option<Checkpoint>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

impl Engine {
    pub fn new(config: EvalConfig) -> Self {
        Self::with_registry(config, FunctionRegistry::with_builtins())
    }

    pub fn with_registry(config: EvalConfig, registry: FunctionRegistry) -> Self {
        Self {
            config,
            registry,
            store: CellStore::new(),
            graph: DependencyGraph::new(config.bounds()),
            last_pass: RecalcPass::default(),
            checkpoint: None,
        }
    }

    pub fn register_function(&mut self, f: Arc<dyn Function>) {
        self.registry.register(f);
    }

    /* ─────────────── addressing ─────────────── */

    pub fn bounds(&self) -> GridBounds {
        self.config.bounds()
    }

    /// Parse an A1 cell id and check it against the grid.
    pub fn resolve(&self, id: &str) -> Result<CellAddr, EngineError> {
        let addr = CellAddr::parse_a1(id).map_err(|source| EngineError::InvalidCellId {
            id: id.to_string(),
            source,
        })?;
        self.check_bounds(addr)?;
        Ok(addr)
    }

    fn check_bounds(&self, addr: CellAddr) -> Result<(), EngineError> {
        if self.bounds().contains(addr) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds {
                addr,
                max_rows: self.config.max_rows,
                max_cols: self.config.max_cols,
            })
        }
    }

    /* ─────────────── mutations ─────────────── */

    /// Replace the whole sheet. Every loaded cell appears in the result.
    pub fn load<I>(&mut self, cells: I) -> Result<Updates, EngineError>
    where
        I: IntoIterator<Item = (CellAddr, CellInput)>,
    {
        let cells: Vec<(CellAddr, CellInput)> = cells.into_iter().collect();
        for (addr, _) in &cells {
            self.check_bounds(*addr)?;
        }
        let _span = tracing::info_span!("load", cells = cells.len()).entered();

        self.checkpoint = Some(Checkpoint::Full {
            store: self.store.clone(),
            graph: self.graph.clone(),
        });
        self.store.clear();
        self.graph.clear();

        let mut roots = Vec::with_capacity(cells.len());
        for (addr, input) in cells {
            match input {
                CellInput::Formula(text) => self.commit_formula(addr, &text),
                CellInput::Value(LiteralValue::Empty) => {}
                CellInput::Value(v) => {
                    self.store.insert(addr, CellRecord::literal(v.to_string(), v));
                }
            }
            roots.push(addr);
        }

        let updates = self.recalc(&roots);
        self.checkpoint = None;
        for addr in roots {
            self.graph.release_if_unused(addr);
        }
        Ok(updates)
    }

    /// Commit a formula. Text without a leading `=` gets one.
    pub fn set_formula(&mut self, addr: CellAddr, formula: &str) -> Result<Updates, EngineError> {
        self.check_bounds(addr)?;
        self.begin(addr);
        self.commit_formula(addr, formula);
        Ok(self.finish(addr))
    }

    /// Commit a non-formula value. `Empty` clears the cell.
    pub fn set_cell_value(
        &mut self,
        addr: CellAddr,
        value: LiteralValue,
    ) -> Result<Updates, EngineError> {
        let raw = value.to_string();
        self.set_literal(addr, raw, value)
    }

    /// Commit raw editor text: a formula when it starts with `=`, a literal otherwise.
    pub fn set_raw(&mut self, addr: CellAddr, raw: &str) -> Result<Updates, EngineError> {
        match CellInput::from_raw(raw) {
            CellInput::Formula(text) => self.set_formula(addr, &text),
            CellInput::Value(value) => self.set_literal(addr, raw.to_string(), value),
        }
    }

    pub fn clear_cell(&mut self, addr: CellAddr) -> Result<Updates, EngineError> {
        self.check_bounds(addr)?;
        self.begin(addr);
        self.store.remove(addr);
        self.graph.clear_precedents(addr);
        Ok(self.finish(addr))
    }

    /// Paste `source` onto `target`, shifting relative references by the offset
    /// between them. References pushed off the grid become `#REF!`.
    pub fn copy_cell(&mut self, source: CellAddr, target: CellAddr) -> Result<Updates, EngineError> {
        self.check_bounds(source)?;
        self.check_bounds(target)?;
        let row_delta = i64::from(target.row) - i64::from(source.row);
        let col_delta = i64::from(target.col) - i64::from(source.col);

        let Some(record) = self.store.get(source).cloned() else {
            return self.clear_cell(target);
        };
        match record.kind {
            CellKind::Empty => self.clear_cell(target),
            CellKind::Literal => self.set_literal(target, record.raw_input, record.cached_value),
            CellKind::Formula(FormulaState::Parsed(ast)) => {
                let moved =
                    ReferenceAdjuster::new(self.bounds()).translate_ast(&ast, row_delta, col_delta);
                let text = render_formula(&moved);
                tracing::debug!(%source, %target, formula = %text, "translated formula");
                self.set_formula(target, &text)
            }
            CellKind::Formula(FormulaState::Invalid(_)) => {
                self.set_formula(target, &record.raw_input)
            }
        }
    }

    /// Undo the partially applied request, if any. Called after a fault.
    pub fn abort_in_flight(&mut self) {
        match self.checkpoint.take() {
            Some(Checkpoint::Cell {
                addr,
                record,
                precedents,
            }) => {
                tracing::warn!(cell = %addr, "rolling back interrupted edit");
                match record {
                    Some(r) => {
                        self.store.insert(addr, r);
                    }
                    None => {
                        self.store.remove(addr);
                    }
                }
                self.graph.set_precedents(addr, &precedents);
            }
            Some(Checkpoint::Full { store, graph }) => {
                tracing::warn!("rolling back interrupted load");
                self.store = store;
                self.graph = graph;
            }
            None => {}
        }
    }

    /* ─────────────── accessors ─────────────── */

    pub fn cell(&self, addr: CellAddr) -> Option<&CellRecord> {
        self.store.get(addr)
    }

    pub fn value(&self, addr: CellAddr) -> LiteralValue {
        self.store.value(addr)
    }

    /// Formula text as committed, for formula cells only.
    pub fn formula_text(&self, addr: CellAddr) -> Option<&str> {
        self.store
            .get(addr)
            .filter(|r| r.is_formula())
            .map(|r| r.raw_input.as_str())
    }

    pub fn last_pass(&self) -> &RecalcPass {
        &self.last_pass
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /* ─────────────── internals ─────────────── */

    fn begin(&mut self, addr: CellAddr) {
        self.checkpoint = Some(Checkpoint::Cell {
            addr,
            record: self.store.get(addr).cloned(),
            precedents: self.graph.precedents_of(addr),
        });
    }

    fn finish(&mut self, addr: CellAddr) -> Updates {
        let updates = self.recalc(&[addr]);
        // the edited cell and the cells it stopped reading may now be unreferenced
        if let Some(Checkpoint::Cell { precedents, .. }) = self.checkpoint.take() {
            for old in precedents {
                self.graph.release_if_unused(old);
            }
        }
        self.graph.release_if_unused(addr);
        updates
    }

    fn set_literal(
        &mut self,
        addr: CellAddr,
        raw: String,
        value: LiteralValue,
    ) -> Result<Updates, EngineError> {
        if matches!(value, LiteralValue::Empty) {
            return self.clear_cell(addr);
        }
        self.check_bounds(addr)?;
        self.begin(addr);
        self.graph.clear_precedents(addr);
        self.store.insert(addr, CellRecord::literal(raw, value));
        Ok(self.finish(addr))
    }

    /// Parse and store a formula and rebuild its edges. No recalculation.
    fn commit_formula(&mut self, addr: CellAddr, formula: &str) {
        let trimmed = formula.trim();
        let raw = if trimmed.starts_with('=') {
            trimmed.to_string()
        } else {
            format!("={trimmed}")
        };

        match parse(&raw) {
            Ok(ast) => {
                let cells = DependencyGraph::precedents_for_ast(&ast, self.bounds());
                self.graph.set_precedents(addr, &cells);
                self.store
                    .insert(addr, CellRecord::formula(raw, FormulaState::Parsed(ast)));
            }
            Err(err) => {
                tracing::debug!(cell = %addr, error = %err, "formula did not parse");
                self.graph.clear_precedents(addr);
                self.store
                    .insert(addr, CellRecord::formula(raw, FormulaState::Invalid(err)));
            }
        }
    }

    /// Recompute `roots` and everything downstream of them.
    ///
    /// Results go to a pending buffer that later evaluations read through;
    /// the store only sees them once the whole pass is done.
    fn recalc(&mut self, roots: &[CellAddr]) -> Updates {
        let _span = tracing::info_span!("recalc", roots = roots.len()).entered();

        let root_ids: Vec<VertexId> = roots.iter().map(|&a| self.graph.vertex_for(a)).collect();
        let affected = self.graph.transitive_dependents(&root_ids);

        let mut pending: FxHashMap<CellAddr, LiteralValue> = FxHashMap::default();
        let mut formulas = Vec::new();
        for id in affected {
            let Some(addr) = self.graph.addr_of(id) else {
                continue;
            };
            match self.store.get(addr) {
                Some(rec) if rec.ast().is_some() => formulas.push(id),
                Some(rec) => {
                    pending.insert(addr, rec.cached_value.clone());
                }
                None => {
                    pending.insert(addr, LiteralValue::Empty);
                }
            }
        }

        let schedule = Scheduler::new(&self.graph).create_schedule(&formulas);

        let mut cycles = Vec::with_capacity(schedule.cycles.len());
        for cycle in &schedule.cycles {
            let cells: Vec<CellAddr> = cycle.iter().filter_map(|&v| self.graph.addr_of(v)).collect();
            tracing::debug!(cells = ?cells, "circular reference");
            for &addr in &cells {
                pending.insert(addr, LiteralValue::Error(CellError::circular()));
            }
            cycles.push(cells);
        }

        let mut order = Vec::new();
        for layer in &schedule.layers {
            for &id in &layer.vertices {
                let Some(addr) = self.graph.addr_of(id) else {
                    continue;
                };
                let Some(ast) = self.store.get(addr).and_then(CellRecord::ast) else {
                    continue;
                };
                let value = {
                    let ctx = OverlayContext {
                        pending: &pending,
                        store: &self.store,
                        registry: &self.registry,
                        bounds: self.config.bounds(),
                    };
                    Interpreter::new(&ctx).evaluate_to_value(ast)
                };
                // a formula that evaluates to nothing shows 0
                let value = match value {
                    LiteralValue::Empty => LiteralValue::Number(0.0),
                    v => v,
                };
                pending.insert(addr, value);
                order.push(addr);
            }
        }
        tracing::debug!(order = ?order, "evaluated");

        let roots: FxHashSet<CellAddr> = roots.iter().copied().collect();
        let mut updates = Updates::new();
        for (addr, value) in pending {
            let changed = match self.store.get_mut(addr) {
                Some(rec) => {
                    let changed = rec.cached_value != value;
                    rec.cached_value = value.clone();
                    changed
                }
                None => !matches!(value, LiteralValue::Empty),
            };
            if changed || roots.contains(&addr) {
                updates.insert(addr, value);
            }
        }

        self.last_pass = RecalcPass { order, cycles };
        updates
    }
}

/// Read view used during a pass: pending results shadow the store.
struct OverlayContext<'a> {
    pending: &'a FxHashMap<CellAddr, LiteralValue>,
    store: &'a CellStore,
    registry: &'a FunctionRegistry,
    bounds: GridBounds,
}

impl ReferenceResolver for OverlayContext<'_> {
    fn cell_value(&self, addr: CellAddr) -> LiteralValue {
        match self.pending.get(&addr) {
            Some(v) => v.clone(),
            None => self.store.value(addr),
        }
    }

    fn bounds(&self) -> GridBounds {
        self.bounds
    }
}

impl FunctionProvider for OverlayContext<'_> {
    fn get_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.registry.get(name)
    }
}
