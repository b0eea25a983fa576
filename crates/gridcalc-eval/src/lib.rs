pub mod builtins;
pub mod coercion;
pub mod function;
pub mod function_registry;
pub mod interpreter;
pub mod traits;

pub mod engine;

#[cfg(test)]
pub mod test_workbook;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineError, EngineWorker, EvalConfig, Request, Response, Updates};
pub use function::{ArgValue, Function};
pub use function_registry::FunctionRegistry;
pub use interpreter::Interpreter;
pub use traits::{EvaluationContext, FunctionProvider, ReferenceResolver};
