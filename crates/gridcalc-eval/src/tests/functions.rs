use std::sync::Arc;

use gridcalc_common::{CellError, CellErrorKind, LiteralValue};

use crate::function::{ArgValue, Function};
use crate::test_workbook::TestWorkbook;

fn n(v: f64) -> LiteralValue {
    LiteralValue::Number(v)
}

fn grid() -> TestWorkbook {
    TestWorkbook::new()
        .with_cell_a1("A1", n(1.0))
        .with_cell_a1("B1", n(2.0))
        .with_cell_a1("A2", n(3.0))
        .with_cell_a1("B2", n(4.0))
        .with_cell_a1("A3", LiteralValue::Text("label".into()))
        .with_cell_a1("B3", LiteralValue::Boolean(true))
}

/* ─────────────── aggregates over ranges ─────────────── */

#[test]
fn sum_over_range() {
    let wb = grid();
    assert_eq!(wb.eval("=SUM(A1:B2)"), n(10.0));
    // reversed corners normalize
    assert_eq!(wb.eval("=SUM(B2:A1)"), n(10.0));
    assert_eq!(wb.eval("=sum(a1:b2, 5)"), n(15.0));
}

#[test]
fn ranges_skip_text_and_booleans() {
    let wb = grid();
    assert_eq!(wb.eval("=SUM(A1:B3)"), n(10.0));
    assert_eq!(wb.eval("=AVERAGE(A1:B3)"), n(2.5));
    assert_eq!(wb.eval("=COUNT(A1:B3)"), n(4.0));
    assert_eq!(wb.eval("=COUNTA(A1:B4)"), n(6.0));
    assert_eq!(wb.eval("=MAX(A1:B3)"), n(4.0));
    assert_eq!(wb.eval("=MIN(A1:B3)"), n(1.0));
}

#[test]
fn scalar_arguments_are_coerced() {
    let wb = grid();
    assert_eq!(wb.eval("=SUM(TRUE, \"2\")"), n(3.0));
    assert_eq!(wb.eval("=SUM(B3)"), n(1.0));
    assert_eq!(
        wb.eval("=SUM(A3)").error_kind(),
        Some(CellErrorKind::Value)
    );
}

#[test]
fn average_of_nothing_is_div_error() {
    let wb = grid();
    assert_eq!(wb.eval("=AVERAGE(C1:C5)").error_kind(), Some(CellErrorKind::Div));
}

#[test]
fn errors_inside_ranges_propagate() {
    let wb = grid().with_cell_a1("C1", LiteralValue::error(CellErrorKind::Div));
    assert_eq!(wb.eval("=SUM(A1:C2)").error_kind(), Some(CellErrorKind::Div));
    assert_eq!(wb.eval("=COUNTA(A1:C2)").error_kind(), Some(CellErrorKind::Div));
}

/* ─────────────── logical and text ─────────────── */

#[test]
fn if_and_boolean_functions() {
    let wb = grid();
    assert_eq!(wb.eval("=IF(A1<B1, \"yes\", \"no\")"), LiteralValue::Text("yes".into()));
    assert_eq!(wb.eval("=IF(FALSE, 1)"), LiteralValue::Boolean(false));
    assert_eq!(wb.eval("=AND(TRUE, A1)"), LiteralValue::Boolean(true));
    assert_eq!(wb.eval("=OR(FALSE, 0)"), LiteralValue::Boolean(false));
    assert_eq!(wb.eval("=NOT(B3)"), LiteralValue::Boolean(false));
    assert_eq!(wb.eval("=TRUE()"), LiteralValue::Boolean(true));
}

#[test]
fn if_evaluates_every_argument() {
    let wb = grid();
    assert_eq!(wb.eval("=IF(TRUE, 1, 1/0)").error_kind(), Some(CellErrorKind::Div));
}

#[test]
fn text_functions() {
    let wb = grid();
    assert_eq!(wb.eval("=CONCAT(A3, \"-\", A1)"), LiteralValue::Text("label-1".into()));
    assert_eq!(wb.eval("=CONCATENATE(\"a\", TRUE)"), LiteralValue::Text("aTRUE".into()));
    assert_eq!(wb.eval("=LEN(A3)"), n(5.0));
    assert_eq!(wb.eval("=UPPER(A3)"), LiteralValue::Text("LABEL".into()));
    assert_eq!(wb.eval("=TRIM(\"  a  \")"), LiteralValue::Text("a".into()));
}

#[test]
fn wrong_arity_is_na() {
    let wb = grid();
    assert_eq!(wb.eval("=ABS()").error_kind(), Some(CellErrorKind::Na));
    assert_eq!(wb.eval("=NOT(1, 2)").error_kind(), Some(CellErrorKind::Na));
}

#[test]
fn math_domain_errors() {
    let wb = grid();
    assert_eq!(wb.eval("=SQRT(-1)").error_kind(), Some(CellErrorKind::Num));
    assert_eq!(wb.eval("=MOD(5, 0)").error_kind(), Some(CellErrorKind::Div));
    assert_eq!(wb.eval("=MOD(-1, 3)"), n(2.0));
    assert_eq!(wb.eval("=POWER(2, 10)"), n(1024.0));
    assert_eq!(wb.eval("=ROUND(2.5)"), n(3.0));
}

/* ─────────────── custom registration ─────────────── */

#[derive(Debug)]
struct DoubleFn;

impl Function for DoubleFn {
    fn name(&self) -> &'static str {
        "DOUBLE"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn eval(&self, args: &[ArgValue]) -> Result<LiteralValue, CellError> {
        Ok(LiteralValue::Number(args[0].number()? * 2.0))
    }
}

#[test]
fn custom_function_needs_no_grammar_change() {
    let wb = grid().with_function(Arc::new(DoubleFn));
    assert_eq!(wb.eval("=double(B2) + 1"), n(9.0));
    assert_eq!(wb.eval("=DOUBLE(A1:B2)").error_kind(), Some(CellErrorKind::Value));
}
