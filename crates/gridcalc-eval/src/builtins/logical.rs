use crate::coercion;
use crate::function::{ArgValue, Function};
use gridcalc_common::{CellError, CellErrorKind, LiteralValue};

/* ─────────────────────────── TRUE() ─────────────────────────────── */

#[derive(Debug)]
pub struct TrueFn;

impl Function for TrueFn {
    fn name(&self) -> &'static str {
        "TRUE"
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn eval(&self, _args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Boolean(true))
    }
}

/* ─────────────────────────── FALSE() ────────────────────────────── */

#[derive(Debug)]
pub struct FalseFn;

impl Function for FalseFn {
    fn name(&self) -> &'static str {
        "FALSE"
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn eval(&self, _args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Boolean(false))
    }
}

/* ─────────────────────────── IF() ───────────────────────────────── */

/// `IF(condition, then, [else])`. A missing `else` yields `FALSE`.
///
/// Arguments are evaluated before the call, so an error in the untaken
/// branch still propagates.
#[derive(Debug)]
pub struct IfFn;

impl Function for IfFn {
    fn name(&self) -> &'static str {
        "IF"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let branch = if args[0].logical()? {
            Some(&args[1])
        } else {
            args.get(2)
        };
        match branch {
            Some(arg) => Ok(arg.scalar()?.clone()),
            None => Ok(LiteralValue::Boolean(false)),
        }
    }
}

/// Logical values of the arguments: scalars are coerced, while ranges
/// contribute only booleans and numbers.
fn logical_values(args: &[ArgValue]) -> Result<Vec<bool>, CellError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            ArgValue::Scalar(LiteralValue::Empty) => {}
            ArgValue::Scalar(v) => out.push(coercion::to_logical(v)?),
            ArgValue::Range(values) => {
                for v in values {
                    match v {
                        LiteralValue::Boolean(b) => out.push(*b),
                        LiteralValue::Number(n) => out.push(*n != 0.0),
                        LiteralValue::Error(e) => return Err(e.clone()),
                        _ => {}
                    }
                }
            }
        }
    }
    if out.is_empty() {
        return Err(CellError::new(CellErrorKind::Value).with_message("No logical values"));
    }
    Ok(out)
}

/* ─────────────────────────── AND() ──────────────────────────────── */

#[derive(Debug)]
pub struct AndFn;

impl Function for AndFn {
    fn name(&self) -> &'static str {
        "AND"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Boolean(logical_values(args)?.into_iter().all(|b| b)))
    }
}

/* ─────────────────────────── OR() ───────────────────────────────── */

#[derive(Debug)]
pub struct OrFn;

impl Function for OrFn {
    fn name(&self) -> &'static str {
        "OR"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Boolean(logical_values(args)?.into_iter().any(|b| b)))
    }
}

/* ─────────────────────────── NOT() ──────────────────────────────── */

#[derive(Debug)]
pub struct NotFn;

impl Function for NotFn {
    fn name(&self) -> &'static str {
        "NOT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Boolean(!args[0].logical()?))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    use std::sync::Arc;
    reg.register(Arc::new(TrueFn));
    reg.register(Arc::new(FalseFn));
    reg.register(Arc::new(IfFn));
    reg.register(Arc::new(AndFn));
    reg.register(Arc::new(OrFn));
    reg.register(Arc::new(NotFn));
}

/* ─────────────────────────── tests ─────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x: bool) -> ArgValue {
        ArgValue::Scalar(LiteralValue::Boolean(x))
    }

    #[test]
    fn if_picks_branch() {
        let then = ArgValue::Scalar(LiteralValue::Text("yes".into()));
        let other = ArgValue::Scalar(LiteralValue::Text("no".into()));
        assert_eq!(
            IfFn.dispatch(&[b(true), then.clone(), other.clone()]),
            Ok(LiteralValue::Text("yes".into()))
        );
        assert_eq!(
            IfFn.dispatch(&[b(false), then.clone(), other]),
            Ok(LiteralValue::Text("no".into()))
        );
        assert_eq!(
            IfFn.dispatch(&[b(false), then]),
            Ok(LiteralValue::Boolean(false))
        );
    }

    #[test]
    fn and_or_over_ranges() {
        let r = ArgValue::Range(vec![
            LiteralValue::Boolean(true),
            LiteralValue::Text("ignored".into()),
            LiteralValue::Number(0.0),
        ]);
        assert_eq!(AndFn.dispatch(std::slice::from_ref(&r)), Ok(LiteralValue::Boolean(false)));
        assert_eq!(OrFn.dispatch(std::slice::from_ref(&r)), Ok(LiteralValue::Boolean(true)));
    }

    #[test]
    fn and_without_logicals_is_value_error() {
        let r = ArgValue::Range(vec![LiteralValue::Empty]);
        assert_eq!(AndFn.dispatch(&[r]).unwrap_err().kind, CellErrorKind::Value);
        let t = ArgValue::Scalar(LiteralValue::Text("maybe".into()));
        assert_eq!(OrFn.dispatch(&[t]).unwrap_err().kind, CellErrorKind::Value);
    }

    #[test]
    fn not_and_constants() {
        assert_eq!(NotFn.dispatch(&[b(true)]), Ok(LiteralValue::Boolean(false)));
        assert_eq!(TrueFn.dispatch(&[]), Ok(LiteralValue::Boolean(true)));
        assert_eq!(FalseFn.dispatch(&[b(true)]).unwrap_err().kind, CellErrorKind::Na);
    }
}
