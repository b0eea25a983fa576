//! The `Function` trait and the argument values functions receive.

use std::panic::{AssertUnwindSafe, catch_unwind};

use gridcalc_common::{CellError, CellErrorKind, LiteralValue};

use crate::coercion;

/// An already-evaluated function argument.
///
/// Range references arrive pre-expanded in row-major order; every other
/// argument expression arrives as a single scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Scalar(LiteralValue),
    Range(Vec<LiteralValue>),
}

impl ArgValue {
    pub fn is_range(&self) -> bool {
        matches!(self, ArgValue::Range(_))
    }

    /// The scalar value, or `#VALUE!` when a range was passed where a single
    /// value is required.
    pub fn scalar(&self) -> Result<&LiteralValue, CellError> {
        match self {
            ArgValue::Scalar(v) => Ok(v),
            ArgValue::Range(_) => Err(CellError::new(CellErrorKind::Value)
                .with_message("Range passed where a single value is expected")),
        }
    }

    pub fn number(&self) -> Result<f64, CellError> {
        coercion::to_number(self.scalar()?)
    }

    pub fn text(&self) -> Result<String, CellError> {
        Ok(coercion::to_text(self.scalar()?))
    }

    pub fn logical(&self) -> Result<bool, CellError> {
        coercion::to_logical(self.scalar()?)
    }

    /// Every contained value; a scalar yields itself.
    pub fn values(&self) -> std::slice::Iter<'_, LiteralValue> {
        match self {
            ArgValue::Scalar(v) => std::slice::from_ref(v).iter(),
            ArgValue::Range(vs) => vs.iter(),
        }
    }
}

impl From<LiteralValue> for ArgValue {
    fn from(v: LiteralValue) -> Self {
        ArgValue::Scalar(v)
    }
}

/// A callable spreadsheet function. Object-safe so the registry can hold
/// `Arc<dyn Function>`.
pub trait Function: Send + Sync + 'static {
    /// Canonical uppercase name.
    fn name(&self) -> &'static str;

    /// Additional names the registry resolves to this function.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn min_args(&self) -> usize {
        0
    }

    /// `None` means variadic.
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Error kind returned when the argument count is outside the declared arity.
    fn arity_error(&self) -> CellErrorKind {
        CellErrorKind::Na
    }

    /// Core work. Arguments are already evaluated and free of errors.
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError>;

    /// Arity check, evaluation, and containment of implementation faults.
    ///
    /// A panic inside `eval` is caught and reported as `#VALUE!` so one bad
    /// function never aborts a recalculation pass. An `Ok(Error(..))` result
    /// is normalized to `Err`, and a non-finite number to `#NUM!`.
    fn dispatch(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        let n = args.len();
        if n < self.min_args() || self.max_args().is_some_and(|max| n > max) {
            return Err(CellError::new(self.arity_error()).with_message(format!(
                "{} received {} argument(s)",
                self.name(),
                n
            )));
        }

        match catch_unwind(AssertUnwindSafe(|| self.eval(args))) {
            Ok(Ok(LiteralValue::Error(e))) => Err(e),
            Ok(Ok(LiteralValue::Number(x))) => coercion::sanitize_numeric(x).map(LiteralValue::Number),
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(function = self.name(), "function panicked during evaluation");
                Err(CellError::new(CellErrorKind::Value)
                    .with_message(format!("{} failed internally", self.name())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding;

    impl Function for Exploding {
        fn name(&self) -> &'static str {
            "EXPLODE"
        }
        fn max_args(&self) -> Option<usize> {
            Some(1)
        }
        fn eval(&self, _args: &[ArgValue]) -> Result<LiteralValue, CellError> {
            panic!("boom")
        }
    }

    #[test]
    fn panics_become_value_errors() {
        let err = Exploding.dispatch(&[]).unwrap_err();
        assert_eq!(err.kind, CellErrorKind::Value);
    }

    #[test]
    fn arity_is_checked_before_eval() {
        let args = vec![ArgValue::Scalar(LiteralValue::Empty); 2];
        let err = Exploding.dispatch(&args).unwrap_err();
        assert_eq!(err.kind, CellErrorKind::Na);
    }

    #[test]
    fn range_is_not_a_scalar() {
        let arg = ArgValue::Range(vec![LiteralValue::Number(1.0)]);
        assert_eq!(arg.scalar().unwrap_err().kind, CellErrorKind::Value);
        assert_eq!(arg.values().count(), 1);
    }
}
