use super::utils::{collect_numbers, power, round_to_precision};
use crate::function::{ArgValue, Function};
use gridcalc_common::{CellError, CellErrorKind, LiteralValue};

/* ─────────────────────────── SUM() ──────────────────────────── */

/// Adds numeric values across scalars and ranges.
///
/// Text, logical values and blanks inside ranges are ignored; a direct
/// text argument that is not numeric is `#VALUE!`.
#[derive(Debug)]
pub struct SumFn;

impl Function for SumFn {
    fn name(&self) -> &'static str {
        "SUM"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let nums = collect_numbers(args)?;
        Ok(LiteralValue::Number(nums.iter().sum()))
    }
}

/* ────────────────────────── PRODUCT() ───────────────────────── */

#[derive(Debug)]
pub struct ProductFn;

impl Function for ProductFn {
    fn name(&self) -> &'static str {
        "PRODUCT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let nums = collect_numbers(args)?;
        if nums.is_empty() {
            return Ok(LiteralValue::Number(0.0));
        }
        Ok(LiteralValue::Number(nums.iter().product()))
    }
}

/* ────────────────────────── AVERAGE() ───────────────────────── */

/// Arithmetic mean. `#DIV/0!` when nothing numeric was supplied.
#[derive(Debug)]
pub struct AverageFn;

impl Function for AverageFn {
    fn name(&self) -> &'static str {
        "AVERAGE"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let nums = collect_numbers(args)?;
        if nums.is_empty() {
            return Err(CellError::new(CellErrorKind::Div)
                .with_message("AVERAGE of no numeric values"));
        }
        Ok(LiteralValue::Number(
            nums.iter().sum::<f64>() / nums.len() as f64,
        ))
    }
}

/* ──────────────────────── MIN() / MAX() ─────────────────────── */

#[derive(Debug)]
pub struct MinFn;

impl Function for MinFn {
    fn name(&self) -> &'static str {
        "MIN"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let nums = collect_numbers(args)?;
        Ok(LiteralValue::Number(
            nums.into_iter().reduce(f64::min).unwrap_or(0.0),
        ))
    }
}

#[derive(Debug)]
pub struct MaxFn;

impl Function for MaxFn {
    fn name(&self) -> &'static str {
        "MAX"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let nums = collect_numbers(args)?;
        Ok(LiteralValue::Number(
            nums.into_iter().reduce(f64::max).unwrap_or(0.0),
        ))
    }
}

/* ─────────────────────── COUNT() / COUNTA() ─────────────────── */

/// Counts numbers: numeric cells in ranges, and scalar arguments that coerce
/// to a number.
#[derive(Debug)]
pub struct CountFn;

impl Function for CountFn {
    fn name(&self) -> &'static str {
        "COUNT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let mut count = 0usize;
        for arg in args {
            match arg {
                ArgValue::Range(values) => {
                    count += values
                        .iter()
                        .filter(|v| matches!(v, LiteralValue::Number(_)))
                        .count();
                }
                ArgValue::Scalar(LiteralValue::Empty) => {}
                ArgValue::Scalar(v) => {
                    if crate::coercion::to_number(v).is_ok() {
                        count += 1;
                    }
                }
            }
        }
        Ok(LiteralValue::Number(count as f64))
    }
}

#[derive(Debug)]
pub struct CountAFn;

impl Function for CountAFn {
    fn name(&self) -> &'static str {
        "COUNTA"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let count = args
            .iter()
            .flat_map(ArgValue::values)
            .filter(|v| !matches!(v, LiteralValue::Empty))
            .count();
        Ok(LiteralValue::Number(count as f64))
    }
}

/* ─────────────────────────── ABS() ──────────────────────────── */

#[derive(Debug)]
pub struct AbsFn;

impl Function for AbsFn {
    fn name(&self) -> &'static str {
        "ABS"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Number(args[0].number()?.abs()))
    }
}

/* ────────────────────────── ROUND() ─────────────────────────── */

/// `ROUND(number, [digits])`, half away from zero. Digits default to 0.
#[derive(Debug)]
pub struct RoundFn;

impl Function for RoundFn {
    fn name(&self) -> &'static str {
        "ROUND"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let n = args[0].number()?;
        let digits = match args.get(1) {
            Some(d) => d.number()?.trunc(),
            None => 0.0,
        };
        // beyond this range the result is either n itself or 0
        let digits = digits.clamp(-308.0, 308.0) as i32;
        Ok(LiteralValue::Number(round_to_precision(n, digits)))
    }
}

/* ─────────────────────────── SQRT() ─────────────────────────── */

#[derive(Debug)]
pub struct SqrtFn;

impl Function for SqrtFn {
    fn name(&self) -> &'static str {
        "SQRT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let n = args[0].number()?;
        if n < 0.0 {
            return Err(CellError::new(CellErrorKind::Num)
                .with_message("SQRT of a negative number"));
        }
        Ok(LiteralValue::Number(n.sqrt()))
    }
}

/* ────────────────────────── POWER() ─────────────────────────── */

#[derive(Debug)]
pub struct PowerFn;

impl Function for PowerFn {
    fn name(&self) -> &'static str {
        "POWER"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        power(args[0].number()?, args[1].number()?).map(LiteralValue::Number)
    }
}

/* ─────────────────────────── MOD() ──────────────────────────── */

/// Remainder carrying the sign of the divisor.
#[derive(Debug)]
pub struct ModFn;

impl Function for ModFn {
    fn name(&self) -> &'static str {
        "MOD"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let n = args[0].number()?;
        let d = args[1].number()?;
        if d == 0.0 {
            return Err(CellError::new(CellErrorKind::Div).with_message("MOD by zero"));
        }
        Ok(LiteralValue::Number(n - d * (n / d).floor()))
    }
}

pub fn register_builtins(reg: &mut crate::function_registry::FunctionRegistry) {
    use std::sync::Arc;
    reg.register(Arc::new(SumFn));
    reg.register(Arc::new(ProductFn));
    reg.register(Arc::new(AverageFn));
    reg.register(Arc::new(MinFn));
    reg.register(Arc::new(MaxFn));
    reg.register(Arc::new(CountFn));
    reg.register(Arc::new(CountAFn));
    reg.register(Arc::new(AbsFn));
    reg.register(Arc::new(RoundFn));
    reg.register(Arc::new(SqrtFn));
    reg.register(Arc::new(PowerFn));
    reg.register(Arc::new(ModFn));
}

/* ─────────────────────────── tests ─────────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64) -> ArgValue {
        ArgValue::Scalar(LiteralValue::Number(x))
    }

    fn range(vals: Vec<LiteralValue>) -> ArgValue {
        ArgValue::Range(vals)
    }

    #[test]
    fn sum_skips_non_numbers_in_ranges() {
        let args = [
            range(vec![
                LiteralValue::Number(1.0),
                LiteralValue::Text("x".into()),
                LiteralValue::Boolean(true),
                LiteralValue::Empty,
                LiteralValue::Number(2.0),
            ]),
            n(3.0),
        ];
        assert_eq!(SumFn.dispatch(&args), Ok(LiteralValue::Number(6.0)));
    }

    #[test]
    fn sum_rejects_direct_text() {
        let args = [ArgValue::Scalar(LiteralValue::Text("abc".into()))];
        assert_eq!(SumFn.dispatch(&args).unwrap_err().kind, CellErrorKind::Value);
        let args = [ArgValue::Scalar(LiteralValue::Text("4".into()))];
        assert_eq!(SumFn.dispatch(&args), Ok(LiteralValue::Number(4.0)));
    }

    #[test]
    fn average_of_nothing_is_div0() {
        let args = [range(vec![LiteralValue::Empty, LiteralValue::Text("a".into())])];
        assert_eq!(AverageFn.dispatch(&args).unwrap_err().kind, CellErrorKind::Div);
        assert_eq!(
            AverageFn.dispatch(&[n(1.0), n(2.0)]),
            Ok(LiteralValue::Number(1.5))
        );
    }

    #[test]
    fn min_max_count() {
        let vals = range(vec![
            LiteralValue::Number(4.0),
            LiteralValue::Number(-2.0),
            LiteralValue::Text("t".into()),
            LiteralValue::Empty,
        ]);
        assert_eq!(MinFn.dispatch(std::slice::from_ref(&vals)), Ok(LiteralValue::Number(-2.0)));
        assert_eq!(MaxFn.dispatch(std::slice::from_ref(&vals)), Ok(LiteralValue::Number(4.0)));
        assert_eq!(CountFn.dispatch(std::slice::from_ref(&vals)), Ok(LiteralValue::Number(2.0)));
        assert_eq!(CountAFn.dispatch(std::slice::from_ref(&vals)), Ok(LiteralValue::Number(3.0)));
        assert_eq!(MaxFn.dispatch(&[range(vec![])]), Ok(LiteralValue::Number(0.0)));
    }

    #[test]
    fn mod_follows_divisor_sign() {
        assert_eq!(ModFn.dispatch(&[n(7.0), n(3.0)]), Ok(LiteralValue::Number(1.0)));
        assert_eq!(ModFn.dispatch(&[n(-7.0), n(3.0)]), Ok(LiteralValue::Number(2.0)));
        assert_eq!(ModFn.dispatch(&[n(7.0), n(-3.0)]), Ok(LiteralValue::Number(-2.0)));
        assert_eq!(
            ModFn.dispatch(&[n(1.0), n(0.0)]).unwrap_err().kind,
            CellErrorKind::Div
        );
    }

    #[test]
    fn scalar_math() {
        assert_eq!(AbsFn.dispatch(&[n(-3.0)]), Ok(LiteralValue::Number(3.0)));
        assert_eq!(SqrtFn.dispatch(&[n(16.0)]), Ok(LiteralValue::Number(4.0)));
        assert_eq!(SqrtFn.dispatch(&[n(-1.0)]).unwrap_err().kind, CellErrorKind::Num);
        assert_eq!(PowerFn.dispatch(&[n(2.0), n(3.0)]), Ok(LiteralValue::Number(8.0)));
        assert_eq!(RoundFn.dispatch(&[n(2.5)]), Ok(LiteralValue::Number(3.0)));
        assert_eq!(RoundFn.dispatch(&[n(1.26), n(1.0)]), Ok(LiteralValue::Number(1.3)));
    }

    #[test]
    fn fixed_arity_mismatch_is_na() {
        assert_eq!(AbsFn.dispatch(&[]).unwrap_err().kind, CellErrorKind::Na);
        assert_eq!(
            ModFn.dispatch(&[n(1.0)]).unwrap_err().kind,
            CellErrorKind::Na
        );
    }
}
