use std::sync::Arc;

use gridcalc_common::{CellAddr, GridBounds, LiteralValue};

use crate::function::Function;

/// Read access to cached cell values.
pub trait ReferenceResolver {
    /// The current value of `addr`; unset cells are `Empty`.
    fn cell_value(&self, addr: CellAddr) -> LiteralValue;

    fn bounds(&self) -> GridBounds;
}

pub trait FunctionProvider {
    fn get_function(&self, name: &str) -> Option<Arc<dyn Function>>;
}

/// Everything the interpreter needs from its surroundings.
pub trait EvaluationContext: ReferenceResolver + FunctionProvider {}
impl<T> EvaluationContext for T where T: ReferenceResolver + FunctionProvider {}
