//! When step definitions
//!
//! Steps that register readers expected to fail, or run a read.

use cucumber::when;
use statetree_reader::{Placement, Reader, SchemaPath};

use crate::world::StateTreeWorld;

fn path(text: &str) -> SchemaPath {
    text.parse().expect("valid schema path")
}

#[when(expr = "a structural reader is registered at {string}")]
fn register_structural(world: &mut StateTreeWorld, at: String) {
    let result = world.registry.add_structural(path(&at));
    world.record_registration(result);
}

#[when(expr = "a structural reader is registered at {string} after {string}")]
fn register_structural_after(world: &mut StateTreeWorld, at: String, anchor: String) {
    let result = world.registry.register_relative(
        path(&at),
        Reader::container(),
        &path(&anchor),
        Placement::After,
    );
    world.record_registration(result);
}

#[when(expr = "{string} is ordered before {string}")]
fn order_before(world: &mut StateTreeWorld, at: String, anchor: String) {
    let result = world
        .registry
        .add_order(&path(&at), &path(&anchor), Placement::Before);
    world.record_registration(result);
}

#[when(expr = "the subtree at {string} is read")]
async fn read_subtree(world: &mut StateTreeWorld, at: String) {
    world.read(&path(&at)).await;
}
