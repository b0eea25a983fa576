//! Dependency-tracked incremental evaluation.
//!
//! The [`Engine`] owns a [`CellStore`] and a [`DependencyGraph`]; every
//! mutation rebuilds the edited cell's edges and recalculates exactly its
//! transitive dependents in [`Scheduler`] order.

pub mod cell_store;
pub mod editor;
pub mod eval;
pub mod graph;
pub mod scheduler;
pub mod vertex;
pub mod worker;

#[cfg(test)]
mod tests;

pub use cell_store::{CellKind, CellRecord, CellStore, FormulaState};
pub use eval::{CellInput, Engine, EngineError, RecalcPass, Updates};
pub use graph::DependencyGraph;
pub use scheduler::{Layer, Schedule, Scheduler};
pub use vertex::{Vertex, VertexId};
pub use worker::{EngineWorker, InputValue, Request, Response, WireValue, WorkerError, handle_request};

use gridcalc_common::GridBounds;

/// Configuration for the evaluation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Highest addressable row (rows start at 1).
    pub max_rows: u32,
    /// Highest addressable column; 26 is `Z`.
    pub max_cols: u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_rows: 100,
            max_cols: 26,
        }
    }
}

impl EvalConfig {
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_max_cols(mut self, max_cols: u32) -> Self {
        self.max_cols = max_cols;
        self
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.max_rows, self.max_cols)
    }
}
