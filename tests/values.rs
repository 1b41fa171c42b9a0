mod common;

use std::collections::HashSet;

#[test]
fn values_project_to_nodes_and_strings() {
    let store = common::store();
    let bob = store.intern("bob").expect("intern");
    let alice = store.intern("alice").expect("intern");
    let values = store.values();
    assert_eq!(values.strings().to_list().expect("list"), vec!["alice", "bob"]);
    assert_eq!(values.nodes().to_set().expect("set"), HashSet::from([alice, bob]));
    assert_eq!(store.nodes().values().size().expect("size"), 2);

    let listed = values.order().to_list().expect("list");
    assert_eq!(listed[0].node(), bob, "ordered by key first");
    assert_eq!(listed[0].string(), "bob");
    assert!(std::ptr::eq(listed[0].owner(), &store));
}

#[test]
fn unvalued_nodes_have_no_values() {
    let store = common::store();
    let fresh = store.new_node().expect("node");
    let named = store.intern("named").expect("intern");
    let nodes = store.new_nodes([fresh, named]).expect("nodes");
    let values = nodes.values().to_list().expect("list");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].node(), named);
}

#[test]
fn values_filter_by_nodes_and_strings() {
    let store = common::store();
    let alice = store.intern("alice").expect("intern");
    let bob = store.intern("bob").expect("intern");

    let by_name = store.new_strings(["alice", "zed"]).expect("strings");
    let found = store.values().with_strings(&by_name).expect("with strings");
    assert_eq!(found.nodes().to_list().expect("list"), vec![alice]);

    let by_node = store.new_nodes([bob]).expect("nodes");
    let found = store.values().with_nodes(&by_node).expect("with nodes");
    assert_eq!(found.strings().to_list().expect("list"), vec!["bob"]);
}

#[test]
fn values_select_by_exact_text() {
    let store = common::store();
    let alice = store.intern("alice").expect("intern");
    store.intern("alice'; drop table Node; --").expect("intern");
    store.intern("bob").expect("intern");

    let found = store.values().with_string("alice");
    assert_eq!(found.nodes().to_list().expect("list"), vec![alice]);
    let quoted = store.values().with_string("alice'; drop table Node; --");
    assert_eq!(quoted.size().expect("size"), 1, "text is bound, never spliced");
    assert!(!store.values().with_string("Alice").has_any().expect("any"));
    assert!(!store.values().with_string("").has_any().expect("any"));
    let chained = found.with_string("alice").with_string("bob");
    assert_eq!(chained.size().expect("size"), 0);
    assert_eq!(store.values().size().expect("size"), 3);
}

#[test]
fn strings_resolve_to_interned_nodes() {
    let store = common::store();
    let bob = store.intern("bob").expect("intern");
    store.intern("carol").expect("intern");

    let strings = store
        .new_strings(vec!["bob".to_owned(), "zed".to_owned(), "bob".to_owned()])
        .expect("strings");
    assert_eq!(strings.size().expect("size"), 2);
    assert_eq!(strings.to_list().expect("list"), vec!["bob", "zed"]);
    assert_eq!(strings.nodes().to_set().expect("set"), HashSet::from([bob]));
    let values = strings.values().to_list().expect("list");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].string(), "bob");

    let unknown = strings.except(&store.values().strings()).expect("except");
    assert_eq!(unknown.to_list().expect("list"), vec!["zed"]);
    let empty = store.new_strings(Vec::<String>::new()).expect("empty");
    assert_eq!(empty.nodes().size().expect("size"), 0);
}

#[test]
fn value_sets_from_items() {
    let store = common::store();
    let alice = store.intern("alice").expect("intern");
    store.intern("bob").expect("intern");
    let listed = store.values().to_list().expect("list");
    let rebuilt = store.new_values(listed.clone()).expect("values");
    assert_eq!(rebuilt.to_list().expect("list"), listed);
    let just_alice = store
        .new_values(listed.into_iter().filter(|value| value.node() == alice))
        .expect("values");
    assert_eq!(just_alice.strings().to_list().expect("list"), vec!["alice"]);
}
