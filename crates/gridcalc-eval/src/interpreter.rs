use gridcalc_common::{CellError, CellErrorKind, LiteralValue};
use gridcalc_parse::parser::{ASTNode, ASTNodeType, ReferenceType};
use smallvec::SmallVec;

use crate::builtins::power;
use crate::coercion;
use crate::function::ArgValue;
use crate::traits::EvaluationContext;

/// Tree-walking evaluator over cached cell values.
///
/// References read the context's current values and never evaluate the
/// precedent formula inline; ordering is the scheduler's job. The first
/// error met in left-to-right, depth-first order becomes the result.
pub struct Interpreter<'a> {
    pub context: &'a dyn EvaluationContext,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a dyn EvaluationContext) -> Self {
        Self { context }
    }

    /* ===================  public  =================== */

    /// Evaluate `node`. An `Err` is the expression's error value.
    pub fn evaluate_ast(&self, node: &ASTNode) -> Result<LiteralValue, CellError> {
        match &node.node_type {
            ASTNodeType::Literal(LiteralValue::Error(e)) => Err(e.clone()),
            ASTNodeType::Literal(v) => Ok(v.clone()),
            ASTNodeType::Reference { reference, .. } => self.eval_reference(reference),
            ASTNodeType::UnaryOp { op, expr } => self.eval_unary(op, expr),
            ASTNodeType::BinaryOp { op, left, right } => self.eval_binary(op, left, right),
            ASTNodeType::Function { name, args } => self.eval_function(name, args),
        }
    }

    /// Like [`Interpreter::evaluate_ast`] but folds errors into the value.
    pub fn evaluate_to_value(&self, node: &ASTNode) -> LiteralValue {
        self.evaluate_ast(node).unwrap_or_else(LiteralValue::Error)
    }

    /* ===================  references  =================== */

    fn eval_reference(&self, reference: &ReferenceType) -> Result<LiteralValue, CellError> {
        match reference {
            ReferenceType::Cell(cell) => {
                let addr = cell.addr();
                if !self.context.bounds().contains(addr) {
                    return Err(CellError::new(CellErrorKind::Ref)
                        .with_message(format!("{cell} is outside the grid")));
                }
                match self.context.cell_value(addr) {
                    LiteralValue::Error(e) => Err(e),
                    v => Ok(v),
                }
            }
            ReferenceType::Range { .. } => Err(CellError::new(CellErrorKind::Ref)
                .with_message(format!("Range {reference} used where a single value is expected"))),
        }
    }

    /// Row-major values of a range; the first error inside wins.
    fn resolve_range(&self, reference: &ReferenceType) -> Result<Vec<LiteralValue>, CellError> {
        let bounds = self.context.bounds();
        if !reference.within(bounds) {
            return Err(CellError::new(CellErrorKind::Ref)
                .with_message(format!("{reference} is outside the grid")));
        }
        let mut values = Vec::new();
        for addr in reference.cells(bounds) {
            match self.context.cell_value(addr) {
                LiteralValue::Error(e) => return Err(e),
                v => values.push(v),
            }
        }
        Ok(values)
    }

    /* ===================  unary ops  =================== */

    fn eval_unary(&self, op: &str, expr: &ASTNode) -> Result<LiteralValue, CellError> {
        let v = self.evaluate_ast(expr)?;
        match op {
            "+" => Ok(v),
            "-" => Ok(LiteralValue::Number(-coercion::to_number(&v)?)),
            _ => Err(CellError::new(CellErrorKind::Value)
                .with_message(format!("Unary op '{op}'"))),
        }
    }

    /* ===================  binary ops  =================== */

    fn eval_binary(
        &self,
        op: &str,
        left: &ASTNode,
        right: &ASTNode,
    ) -> Result<LiteralValue, CellError> {
        let l = self.evaluate_ast(left)?;
        let r = self.evaluate_ast(right)?;

        match op {
            "=" | "<>" | "<" | ">" | "<=" | ">=" => Ok(LiteralValue::Boolean(Self::compare(op, &l, &r))),
            "&" => Ok(LiteralValue::Text(format!(
                "{}{}",
                coercion::to_text(&l),
                coercion::to_text(&r)
            ))),
            "+" => self.numeric_binary(&l, &r, |a, b| a + b),
            "-" => self.numeric_binary(&l, &r, |a, b| a - b),
            "*" => self.numeric_binary(&l, &r, |a, b| a * b),
            "/" => self.divide(&l, &r),
            "^" => {
                let (a, b) = (coercion::to_number(&l)?, coercion::to_number(&r)?);
                power(a, b).map(LiteralValue::Number)
            }
            _ => Err(CellError::new(CellErrorKind::Value)
                .with_message(format!("Binary op '{op}'"))),
        }
    }

    /* ===================  function calls  =================== */

    fn eval_function(&self, name: &str, args: &[ASTNode]) -> Result<LiteralValue, CellError> {
        let Some(fun) = self.context.get_function(name) else {
            return Err(CellError::new(CellErrorKind::Name)
                .with_message(format!("Unknown function {name}")));
        };

        let mut values: SmallVec<[ArgValue; 4]> = SmallVec::with_capacity(args.len());
        for arg in args {
            match &arg.node_type {
                ASTNodeType::Reference {
                    reference: reference @ ReferenceType::Range { .. },
                    ..
                } => values.push(ArgValue::Range(self.resolve_range(reference)?)),
                _ => values.push(ArgValue::Scalar(self.evaluate_ast(arg)?)),
            }
        }
        fun.dispatch(&values)
    }

    /* ===================  helpers  =================== */

    fn numeric_binary<F>(
        &self,
        left: &LiteralValue,
        right: &LiteralValue,
        f: F,
    ) -> Result<LiteralValue, CellError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let a = coercion::to_number(left)?;
        let b = coercion::to_number(right)?;
        coercion::sanitize_numeric(f(a, b)).map(LiteralValue::Number)
    }

    fn divide(&self, left: &LiteralValue, right: &LiteralValue) -> Result<LiteralValue, CellError> {
        let a = coercion::to_number(left)?;
        let b = coercion::to_number(right)?;
        if b == 0.0 {
            return Err(CellError::new(CellErrorKind::Div));
        }
        coercion::sanitize_numeric(a / b).map(LiteralValue::Number)
    }

    fn compare(op: &str, left: &LiteralValue, right: &LiteralValue) -> bool {
        use std::cmp::Ordering::*;
        let ord = coercion::compare_values(left, right);
        match op {
            "=" => ord == Equal,
            "<>" => ord != Equal,
            "<" => ord == Less,
            ">" => ord == Greater,
            "<=" => ord != Greater,
            ">=" => ord != Less,
            _ => false,
        }
    }
}
