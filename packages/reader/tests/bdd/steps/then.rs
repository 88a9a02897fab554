//! Then step definitions
//!
//! Steps that verify registration outcomes and assembled records.

use cucumber::then;
use statetree_reader::{SchemaPath, Value};

use crate::world::{error_kind, StateTreeWorld};

#[then(expr = "registration fails with {string}")]
fn registration_fails(world: &mut StateTreeWorld, kind: String) {
    let err = world
        .registration_error
        .as_ref()
        .expect("expected a registration error");
    assert_eq!(error_kind(err), kind, "unexpected error: {err}");
}

#[then(expr = "the children of {string} are read in order {string}")]
fn children_order(world: &mut StateTreeWorld, parent: String, expected: String) {
    let parent: SchemaPath = parent.parse().expect("valid schema path");
    let names: Vec<&str> = world
        .registry
        .children_of(&parent)
        .iter()
        .map(SchemaPath::name)
        .collect();
    let expected: Vec<&str> = expected.split(',').map(str::trim).collect();
    assert_eq!(names, expected);
}

#[then("the read succeeds")]
fn read_succeeds(world: &mut StateTreeWorld) {
    assert!(
        world.error.is_none(),
        "Expected successful read, got error: {:?}",
        world.error
    );
}

#[then(expr = "the read fails with {string}")]
fn read_fails(world: &mut StateTreeWorld, kind: String) {
    let err = world.error.as_ref().expect("expected a read error");
    assert_eq!(error_kind(err), kind, "unexpected error: {err}");
    assert!(world.report.is_none(), "no partial record on failure");
}

#[then(expr = "the element list has ids {string}")]
fn element_ids(world: &mut StateTreeWorld, expected: String) {
    let elements = world.record().list("element").expect("element list");
    let ids: Vec<String> = elements
        .iter()
        .filter_map(|e| e.leaf("id"))
        .map(ToString::to_string)
        .collect();
    let expected: Vec<String> = expected
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    assert_eq!(ids, expected);
}

#[then(expr = "element {int} has description {string}")]
fn element_description(world: &mut StateTreeWorld, id: i64, description: String) {
    let elements = world.record().list("element").expect("element list");
    let element = elements
        .iter()
        .find(|e| e.key() == Some(&Value::Int(id)))
        .unwrap_or_else(|| panic!("no element with id {id}"));
    assert_eq!(element.leaf("description"), Some(&Value::from(description)));
}

#[then(expr = "the record has fields {string}")]
fn record_fields(world: &mut StateTreeWorld, expected: String) {
    let expected: Vec<&str> = expected.split(',').map(str::trim).collect();
    assert_eq!(world.record().field_names(), expected);
}

#[then(expr = "{int} failure(s) is/are recorded")]
fn failures_recorded(world: &mut StateTreeWorld, count: usize) {
    let report = world.report.as_ref().expect("successful read");
    assert_eq!(report.failures.len(), count);
}

#[then(expr = "{int} instance(s) is/are dropped")]
fn instances_dropped(world: &mut StateTreeWorld, count: usize) {
    let report = world.report.as_ref().expect("successful read");
    assert_eq!(report.dropped.len(), count);
}
