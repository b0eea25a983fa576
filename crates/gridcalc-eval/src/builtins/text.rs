use crate::coercion;
use crate::function::{ArgValue, Function};
use gridcalc_common::{CellError, LiteralValue};

/* ───────────────────── CONCAT() / CONCATENATE() ──────────────────── */

/// Joins the display text of every argument; ranges contribute each cell.
#[derive(Debug)]
pub struct ConcatFn;

impl Function for ConcatFn {
    fn name(&self) -> &'static str {
        "CONCAT"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["CONCATENATE"]
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let out: String = args
            .iter()
            .flat_map(ArgValue::values)
            .map(coercion::to_text)
            .collect();
        Ok(LiteralValue::Text(out))
    }
}

/* ─────────────────────────── LEN() ──────────────────────────────── */

#[derive(Debug)]
pub struct LenFn;

impl Function for LenFn {
    fn name(&self) -> &'static str {
        "LEN"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Number(args[0].text()?.chars().count() as f64))
    }
}

/* ────────────────────── UPPER() / LOWER() / TRIM() ───────────────── */

#[derive(Debug)]
pub struct UpperFn;

impl Function for UpperFn {
    fn name(&self) -> &'static str {
        "UPPER"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Text(args[0].text()?.to_uppercase()))
    }
}

#[derive(Debug)]
pub struct LowerFn;

impl Function for LowerFn {
    fn name(&self) -> &'static str {
        "LOWER"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Text(args[0].text()?.to_lowercase()))
    }
}

/// Strips leading/trailing spaces and collapses inner runs to one space.
#[derive(Debug)]
pub struct TrimFn;

impl Function for TrimFn {
    fn name(&self) -> &'static str {
        "TRIM"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let text = args[0].text()?;
        let trimmed = text.split(' ').filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
        Ok(LiteralValue::Text(trimmed))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    use std::sync::Arc;
    reg.register(Arc::new(ConcatFn));
    reg.register(Arc::new(LenFn));
    reg.register(Arc::new(UpperFn));
    reg.register(Arc::new(LowerFn));
    reg.register(Arc::new(TrimFn));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ArgValue {
        ArgValue::Scalar(LiteralValue::Text(s.into()))
    }

    #[test]
    fn concat_flattens_ranges() {
        let args = [
            t("a"),
            ArgValue::Range(vec![
                LiteralValue::Number(1.0),
                LiteralValue::Empty,
                LiteralValue::Boolean(true),
            ]),
        ];
        assert_eq!(ConcatFn.dispatch(&args), Ok(LiteralValue::Text("a1TRUE".into())));
    }

    #[test]
    fn len_counts_chars() {
        assert_eq!(LenFn.dispatch(&[t("héllo")]), Ok(LiteralValue::Number(5.0)));
        assert_eq!(
            LenFn.dispatch(&[ArgValue::Scalar(LiteralValue::Number(12.5))]),
            Ok(LiteralValue::Number(4.0))
        );
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(UpperFn.dispatch(&[t("abc")]), Ok(LiteralValue::Text("ABC".into())));
        assert_eq!(LowerFn.dispatch(&[t("AbC")]), Ok(LiteralValue::Text("abc".into())));
        assert_eq!(
            TrimFn.dispatch(&[t("  a   b  ")]),
            Ok(LiteralValue::Text("a b".into()))
        );
    }
}
