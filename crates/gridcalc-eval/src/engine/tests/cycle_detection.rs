//! Circular references: detection, atomic assignment and recovery.
use gridcalc_common::{CellErrorKind, GridBounds};

use super::common::*;
use crate::engine::{DependencyGraph, Scheduler, VertexId};

fn is_circular(e: &crate::engine::Engine, id: &str) -> bool {
    value(e, id).error_kind() == Some(CellErrorKind::Circular)
}

#[test]
fn scheduler_separates_cycle_from_acyclic_branch() {
    let mut g = DependencyGraph::new(GridBounds::default());
    g.set_precedents(a("A1"), &[a("B1")]);
    g.set_precedents(a("B1"), &[a("A1")]);
    g.set_precedents(a("C1"), &[a("D1")]);
    g.set_precedents(a("E1"), &[a("C1"), a("A1")]);

    let all: Vec<VertexId> = g.vertices().map(|v| v.id).collect();
    let schedule = Scheduler::new(&g).create_schedule(&all);

    assert_eq!(schedule.cycles.len(), 1);
    let mut cycle: Vec<_> = schedule.cycles[0]
        .iter()
        .map(|&v| g.addr_of(v).unwrap())
        .collect();
    cycle.sort();
    assert_eq!(cycle, vec![a("A1"), a("B1")]);

    let order: Vec<_> = schedule
        .order()
        .into_iter()
        .map(|v| g.addr_of(v).unwrap())
        .collect();
    assert_eq!(order, vec![a("D1"), a("C1"), a("E1")]);
}

#[test]
fn two_cell_cycle_marks_both() {
    let mut e = engine();
    set(&mut e, "A1", "=B1+1");
    assert_eq!(value(&e, "A1"), num(1.0));

    let updates = set(&mut e, "B1", "=A1+1");
    assert_eq!(ids(&updates), vec!["A1", "B1"]);
    assert!(is_circular(&e, "A1"));
    assert!(is_circular(&e, "B1"));
    assert_eq!(e.last_pass().cycles.len(), 1);
}

#[test]
fn self_reference_is_circular() {
    let mut e = engine();
    set(&mut e, "A1", "=A1+1");
    assert!(is_circular(&e, "A1"));
    set(&mut e, "B1", "=SUM(A1:B2)");
    assert!(is_circular(&e, "B1"));
}

#[test]
fn dependents_of_a_cycle_see_the_error() {
    let mut e = engine();
    set(&mut e, "C1", "=A1*2");
    set(&mut e, "A1", "=B1");
    set(&mut e, "B1", "=A1");
    assert!(is_circular(&e, "C1"));
    assert!(!e.last_pass().order.contains(&a("A1")));
}

#[test]
fn breaking_the_cycle_restores_every_member() {
    let mut e = engine();
    set(&mut e, "A1", "=C1+1");
    set(&mut e, "B1", "=A1+1");
    set(&mut e, "C1", "=B1+1");
    set(&mut e, "D1", "=C1*10");
    for id in ["A1", "B1", "C1", "D1"] {
        assert!(is_circular(&e, id), "{id} should be circular");
    }

    let updates = set(&mut e, "C1", "5");
    assert_eq!(ids(&updates), vec!["A1", "B1", "C1", "D1"]);
    assert_eq!(value(&e, "A1"), num(6.0));
    assert_eq!(value(&e, "B1"), num(7.0));
    assert_eq!(value(&e, "D1"), num(50.0));
    assert!(e.last_pass().cycles.is_empty());
}

#[test]
fn clearing_a_member_breaks_the_cycle() {
    let mut e = engine();
    set(&mut e, "A1", "=B1");
    set(&mut e, "B1", "=A1");
    e.clear_cell(a("B1")).unwrap();
    assert_eq!(value(&e, "A1"), num(0.0));
}

#[test]
fn cycle_through_range_reference() {
    let mut e = engine();
    set(&mut e, "A2", "1");
    set(&mut e, "A1", "=SUM(A2:A3)");
    set(&mut e, "A3", "=A1");
    assert!(is_circular(&e, "A1"));
    assert!(is_circular(&e, "A3"));
    assert_eq!(value(&e, "A2"), num(1.0));

    set(&mut e, "A3", "2");
    assert_eq!(value(&e, "A1"), num(3.0));
}
