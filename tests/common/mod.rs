#![allow(dead_code)]

use quadstore::{Edge, Node, QuadStore};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness; set RUST_LOG to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn store() -> QuadStore {
    init_tracing();
    QuadStore::in_memory().expect("in-memory store")
}

pub fn put<'s>(
    store: &'s QuadStore,
    c: &Node<'s>,
    p: &Node<'s>,
    s: &Node<'s>,
    o: &Node<'s>,
) -> Edge<'s> {
    let edge = store.new_edge_with(c, p, s, o).expect("edge");
    edge.put().expect("put edge");
    edge
}
