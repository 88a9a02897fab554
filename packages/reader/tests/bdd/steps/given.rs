//! Given step definitions
//!
//! Steps that set up registrations, backend data and read policies.

use cucumber::{gherkin::Step, given};
use statetree_reader::{FailurePolicy, NodeRecord, Placement, SchemaPath, Value};

use crate::world::StateTreeWorld;

fn path(text: &str) -> SchemaPath {
    text.parse().expect("valid schema path")
}

// =============================================================================
// Registration steps
// =============================================================================

#[given(expr = "a structural reader registered at {string}")]
fn register_structural(world: &mut StateTreeWorld, at: String) {
    world
        .registry
        .add_structural(path(&at))
        .expect("registration succeeds");
}

#[given("structural readers registered at:")]
fn register_structural_table(world: &mut StateTreeWorld, step: &Step) {
    let table = step.table.as_ref().expect("table of paths");
    for row in table.rows.iter().skip(1) {
        world
            .registry
            .add_structural(path(&row[0]))
            .expect("registration succeeds");
    }
}

#[given(expr = "a structural reader registered at {string} before {string}")]
fn register_structural_before(world: &mut StateTreeWorld, at: String, anchor: String) {
    let reader = statetree_reader::Reader::container();
    world
        .registry
        .register_relative(path(&at), reader, &path(&anchor), Placement::Before)
        .expect("registration succeeds");
}

#[given(expr = "{string} is ordered before {string}")]
fn order_before(world: &mut StateTreeWorld, at: String, anchor: String) {
    world
        .registry
        .add_order(&path(&at), &path(&anchor), Placement::Before)
        .expect("ordering succeeds");
}

#[given(expr = "an element list registered at {string}")]
fn register_element_list(world: &mut StateTreeWorld, at: String) {
    let reader = world.element_reader();
    world
        .registry
        .register(path(&at), reader)
        .expect("registration succeeds");
}

// =============================================================================
// Backend steps
// =============================================================================

#[given("the backend holds the elements:")]
fn backend_elements(world: &mut StateTreeWorld, step: &Step) {
    let table = step.table.as_ref().expect("table of elements");
    for row in table.rows.iter().skip(1) {
        let id: i64 = row[0].trim().parse().expect("integer id");
        world
            .service
            .insert(NodeRecord::new(id).with_field("description", row[1].trim()));
    }
}

#[given(expr = "element {int} is deleted concurrently")]
fn element_vanishes(world: &mut StateTreeWorld, id: i64) {
    world.service.vanish_on_read_one(Value::Int(id));
}

#[given("the backend is unavailable")]
fn backend_unavailable(world: &mut StateTreeWorld) {
    world.service.set_unavailable(true);
}

// =============================================================================
// Policy steps
// =============================================================================

#[given(expr = "the failure policy is {string}")]
fn failure_policy(world: &mut StateTreeWorld, policy: String) {
    let policy: FailurePolicy = policy.parse().expect("known failure policy");
    world.config = world.config.clone().with_failure_policy(policy);
}
