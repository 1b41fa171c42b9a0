mod common;

use std::collections::HashSet;

#[test]
fn popping_a_node_cascades_to_its_edges() {
    let store = common::store();
    let n = store.intern("n").expect("intern");
    let m = store.intern("m").expect("intern");
    let e1 = common::put(&store, &m, &n, &m, &m);
    let e2 = common::put(&store, &m, &m, &m, &n);
    let e3 = common::put(&store, &m, &m, &m, &m);
    assert_eq!(store.edges().size().expect("size"), 3);

    assert!(n.pop().expect("pop"));
    assert_eq!(n.value().expect("value"), None);
    assert!(!n.state().expect("state"));
    assert!(!e1.state().expect("state") && !e2.state().expect("state"));
    assert_eq!(store.edges().to_set().expect("set"), HashSet::from([e3]));
    assert!(!n.pop().expect("second pop"));
}

#[test]
fn popping_a_value_keeps_the_edges() {
    let store = common::store();
    let n = store.intern("n").expect("intern");
    let edge = common::put(&store, &n, &n, &n, &n);
    let value = store.values().to_list().expect("list").remove(0);
    assert_eq!(value.node(), n);
    assert_eq!(value.string(), "n");
    assert!(value.pop().expect("pop"));
    assert!(!value.state().expect("state"));
    assert!(edge.state().expect("edge survives"));
    assert!(n.state().expect("still used by the edge"));
    assert_eq!(store.get_node("n").expect("lookup"), None);
}

#[test]
fn popping_node_and_edge_sets() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    let b = store.intern("b").expect("intern");
    let c = store.intern("c").expect("intern");
    common::put(&store, &a, &a, &a, &b);
    common::put(&store, &c, &c, &c, &c);

    assert!(!store.new_nodes([a]).expect("nodes").put_all().expect("put nodes"));
    assert!(store.new_nodes([a]).expect("nodes").pop_all().expect("pop nodes"));
    assert_eq!(store.edges().size().expect("size"), 1);
    assert_eq!(store.values().strings().to_list().expect("list"), vec!["b", "c"]);

    assert!(store.edges().pop_all().expect("pop edges"));
    assert!(!store.edges().pop_all().expect("pop nothing"));
    assert_eq!(store.edges().size().expect("size"), 0);
}

#[test]
fn copies_do_not_follow_later_changes() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    let b = store.intern("b").expect("intern");
    let e1 = common::put(&store, &a, &a, &a, &b);
    let e2 = common::put(&store, &a, &a, &b, &b);

    let view = store.edges().having_subject(&a).expect("having");
    let frozen = view.copy().expect("copy");
    let filtered = store.edges().having(|edge| edge.subject() == a).expect("having");
    let filtered_copy = filtered.copy().expect("copy");
    assert!(e1.pop().expect("pop"));

    assert_eq!(view.size().expect("size"), 0, "views are evaluated on every read");
    assert_eq!(frozen.to_set().expect("set"), HashSet::from([e1]));
    assert_eq!(filtered_copy.to_set().expect("set"), HashSet::from([e1]));
    assert_eq!(store.edges().to_list().expect("list"), vec![e2]);

    // materialized content can be written back
    assert!(frozen.put_all().expect("restore"));
    assert!(e1.state().expect("state"));
}

#[test]
fn values_round_trip_through_copies() {
    let store = common::store();
    let alice = store.intern("alice").expect("intern");
    store.intern("bob").expect("intern");
    let saved = store.values().copy().expect("copy");
    assert!(store.values().pop_all().expect("pop values"));
    assert_eq!(store.get_node("alice").expect("lookup"), None);
    assert_eq!(saved.having_state(false).expect("gone").size().expect("size"), 2);

    assert!(saved.put_all().expect("put values"));
    assert_eq!(store.get_node("alice").expect("lookup"), Some(alice));
    assert_eq!(saved.having_state(true).expect("back").size().expect("size"), 2);
}

#[test]
fn reset_empties_the_store() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    common::put(&store, &a, &a, &a, &a);
    store.new_node().expect("node");
    store.reset().expect("reset");

    assert_eq!(store.edges().size().expect("size"), 0);
    assert_eq!(store.values().size().expect("size"), 0);
    assert_eq!(store.new_node().expect("node").key(), 1, "the key counter restarts");
}

#[test]
fn compact_drops_unused_values() {
    let store = common::store();
    let used = store.intern("used").expect("intern");
    store.intern("orphan").expect("intern");
    common::put(&store, &used, &used, &used, &used);

    assert!(store.compact().expect("compact"));
    assert_eq!(store.get_node("orphan").expect("lookup"), None);
    assert_eq!(store.get_node("used").expect("lookup"), Some(used));
    assert!(!store.compact().expect("nothing left to compact"));
}

#[test]
fn close_after_sets_are_gone() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    {
        let nodes = store.new_nodes([a]).expect("nodes");
        let copy = store.edges().copy().expect("copy");
        assert_eq!(nodes.size().expect("size") + copy.size().expect("size"), 1);
    }
    store.close().expect("close");
}
