//! Meta crate that re-exports the gridcalc layers: shared value types,
//! the formula parser and the evaluation engine.

pub use gridcalc_common as common;
pub use gridcalc_eval as eval;
pub use gridcalc_parse as parse;

pub use gridcalc_common::{CellAddr, CellError, CellErrorKind, GridBounds, LiteralValue};
pub use gridcalc_eval::engine::{
    CellInput, Engine, EngineError, EngineWorker, EvalConfig, InputValue, Request, Response,
    Updates, WireValue, handle_request,
};
pub use gridcalc_parse::{ASTNode, parse as parse_formula, render_formula};
