use gridcalc_common::{CellError, CellErrorKind, LiteralValue};

use crate::coercion;
use crate::function::ArgValue;

/// Numbers contributed by aggregate arguments.
///
/// Scalars are coerced (unparseable text is `#VALUE!`); inside ranges only
/// numeric cells count and text, booleans and blanks are skipped.
pub fn collect_numbers(args: &[ArgValue]) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            ArgValue::Scalar(v) => out.push(coercion::to_number(v)?),
            ArgValue::Range(values) => {
                for v in values {
                    match v {
                        LiteralValue::Number(n) => out.push(*n),
                        LiteralValue::Error(e) => return Err(e.clone()),
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(out)
}

/// Half away from zero; negative `digits` rounds left of the decimal point.
pub fn round_to_precision(n: f64, digits: i32) -> f64 {
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        (n * factor).round() / factor
    } else {
        let factor = 10f64.powi(-digits);
        (n / factor).round() * factor
    }
}

/// `base ^ exponent` with spreadsheet domain rules.
pub fn power(base: f64, exponent: f64) -> Result<f64, CellError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(CellError::new(CellErrorKind::Div).with_message("Zero raised to a negative power"));
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(CellError::new(CellErrorKind::Num)
            .with_message("Negative base raised to a fractional power"));
    }
    coercion::sanitize_numeric(base.powf(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round_to_precision(1.23456, 2), 1.23);
        assert_eq!(round_to_precision(-2.5, 0), -3.0);
        assert_eq!(round_to_precision(1234.0, -2), 1200.0);
    }

    #[test]
    fn power_domain() {
        assert_eq!(power(2.0, 10.0), Ok(1024.0));
        assert_eq!(power(0.0, -1.0).unwrap_err().kind, CellErrorKind::Div);
        assert_eq!(power(-8.0, 0.5).unwrap_err().kind, CellErrorKind::Num);
        assert_eq!(power(-2.0, 3.0), Ok(-8.0));
    }
}
