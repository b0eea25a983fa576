//! Copy/paste translation through the engine.
use gridcalc_common::{CellErrorKind, LiteralValue};

use super::common::*;

#[test]
fn relative_references_follow_the_paste() {
    let mut e = engine();
    set(&mut e, "A1", "10");
    set(&mut e, "A2", "30");
    set(&mut e, "B1", "100");
    set(&mut e, "B2", "200");
    set(&mut e, "A3", "=A1+A2");
    assert_eq!(value(&e, "A3"), num(40.0));

    let updates = e.copy_cell(a("A3"), a("B3")).unwrap();
    assert_eq!(e.formula_text(a("B3")), Some("=B1+B2"));
    assert_eq!(updates[&a("B3")], num(300.0));
}

#[test]
fn absolute_references_stay_fixed() {
    let mut e = engine();
    set(&mut e, "A1", "10");
    set(&mut e, "A2", "30");
    set(&mut e, "A3", "=$A$1+$A$2");
    assert_eq!(value(&e, "A3"), num(40.0));

    e.copy_cell(a("A3"), a("B3")).unwrap();
    assert_eq!(e.formula_text(a("B3")), Some("=$A$1+$A$2"));
    assert_eq!(value(&e, "B3"), num(40.0));
}

#[test]
fn mixed_reference_moves_only_its_row() {
    let mut e = engine();
    set(&mut e, "A1", "100");
    set(&mut e, "A2", "200");
    set(&mut e, "A3", "=$A1");
    assert_eq!(value(&e, "A3"), num(100.0));

    e.copy_cell(a("A3"), a("B4")).unwrap();
    assert_eq!(e.formula_text(a("B4")), Some("=$A2"));
    assert_eq!(value(&e, "B4"), num(200.0));
}

#[test]
fn range_arguments_shift_as_a_block() {
    let mut e = engine();
    set(&mut e, "A1", "1");
    set(&mut e, "B1", "2");
    set(&mut e, "A2", "3");
    set(&mut e, "B2", "4");
    set(&mut e, "A3", "=SUM(A1:B2)");
    assert_eq!(value(&e, "A3"), num(10.0));

    for (id, v) in [("B2", "10"), ("C2", "20"), ("B3", "30"), ("C3", "40")] {
        set(&mut e, id, v);
    }
    e.copy_cell(a("A3"), a("B4")).unwrap();
    assert_eq!(e.formula_text(a("B4")), Some("=SUM(B2:C3)"));
    assert_eq!(value(&e, "B4"), num(100.0));
    assert_eq!(e.graph().precedents_of(a("B4")).len(), 4);
}

#[test]
fn pasted_formula_tracks_its_new_precedents() {
    let mut e = engine();
    set(&mut e, "A1", "1");
    set(&mut e, "B1", "=A1*2");
    e.copy_cell(a("B1"), a("B2")).unwrap();
    assert_eq!(value(&e, "B2"), num(0.0));

    let updates = set(&mut e, "A2", "21");
    assert_eq!(updates[&a("B2")], num(42.0));
    assert_eq!(value(&e, "B1"), num(2.0));
}

#[test]
fn paste_past_last_column_is_ref_error() {
    let mut e = engine();
    set(&mut e, "Y1", "=Z1+1");
    e.copy_cell(a("Y1"), a("Z1")).unwrap();
    assert_eq!(e.formula_text(a("Z1")), Some("=#REF!+1"));
    assert_eq!(value(&e, "Z1").error_kind(), Some(CellErrorKind::Ref));
}

#[test]
fn paste_above_first_row_is_ref_error() {
    let mut e = engine();
    set(&mut e, "B2", "=SUM(A1:A3)");
    e.copy_cell(a("B2"), a("B1")).unwrap();
    assert_eq!(e.formula_text(a("B1")), Some("=SUM(#REF!)"));
    assert_eq!(value(&e, "B1").error_kind(), Some(CellErrorKind::Ref));
}

#[test]
fn paste_past_last_row_respects_configured_bounds() {
    let mut e = crate::engine::Engine::new(crate::engine::EvalConfig::default().with_max_rows(5));
    set(&mut e, "A1", "=A5");
    e.copy_cell(a("A1"), a("A2")).unwrap();
    assert_eq!(value(&e, "A2").error_kind(), Some(CellErrorKind::Ref));
}

#[test]
fn literals_copy_verbatim() {
    let mut e = engine();
    set(&mut e, "A1", "hello");
    e.copy_cell(a("A1"), a("C7")).unwrap();
    assert_eq!(value(&e, "C7"), LiteralValue::Text("hello".into()));
    assert_eq!(e.formula_text(a("C7")), None);
}

#[test]
fn copying_a_blank_clears_the_target() {
    let mut e = engine();
    set(&mut e, "B1", "5");
    let updates = e.copy_cell(a("A1"), a("B1")).unwrap();
    assert_eq!(updates[&a("B1")], LiteralValue::Empty);
    assert!(e.cell(a("B1")).is_none());
}

#[test]
fn broken_formula_copies_as_written() {
    let mut e = engine();
    set(&mut e, "A1", "=SUM(1,,2)");
    e.copy_cell(a("A1"), a("B1")).unwrap();
    assert_eq!(e.formula_text(a("B1")), Some("=SUM(1,,2)"));
    assert_eq!(value(&e, "B1").error_kind(), Some(CellErrorKind::Parse));
}
