//! Common test helpers
use gridcalc_common::{CellAddr, LiteralValue};

use crate::engine::{Engine, EvalConfig, Updates};

pub fn a(s: &str) -> CellAddr {
    CellAddr::parse_a1(s).expect("valid A1 id")
}

pub fn engine() -> Engine {
    Engine::new(EvalConfig::default())
}

/// Commit editor text to a cell, panicking on request-level failure.
pub fn set(engine: &mut Engine, id: &str, raw: &str) -> Updates {
    engine.set_raw(a(id), raw).expect("set_raw")
}

pub fn value(engine: &Engine, id: &str) -> LiteralValue {
    engine.value(a(id))
}

pub fn num(v: f64) -> LiteralValue {
    LiteralValue::Number(v)
}

/// Updated cell ids, row-major.
pub fn ids(updates: &Updates) -> Vec<String> {
    updates.keys().map(|k| k.to_a1()).collect()
}
