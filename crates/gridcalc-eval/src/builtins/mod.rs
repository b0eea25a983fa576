pub mod logical;
pub mod math;
pub mod text;
mod utils;

pub(crate) use utils::power;

use crate::function_registry::FunctionRegistry;

pub fn load_builtins(reg: &mut FunctionRegistry) {
    logical::register_builtins(reg);
    math::register_builtins(reg);
    text::register_builtins(reg);
}
