mod common;

use std::collections::HashSet;

use quadstore::QuadError;

#[test]
fn alice_and_bob() {
    let store = common::store();
    let alice = store.intern("alice").expect("intern");
    let bob = store.intern("bob").expect("intern");
    common::put(&store, &alice, &bob, &alice, &bob);

    let edges = store.edges();
    assert_eq!(edges.subjects().to_set().expect("set"), HashSet::from([alice]));
    assert_eq!(edges.having_object(&alice).expect("having").size().expect("size"), 0);
    assert_eq!(edges.having_object(&bob).expect("having").size().expect("size"), 1);
    assert_eq!(edges.nodes().to_set().expect("set"), HashSet::from([alice, bob]));
    assert_eq!(edges.contexts().to_list().expect("list"), vec![alice]);
    assert_eq!(edges.predicates().to_list().expect("list"), vec![bob]);
}

#[test]
fn replacing_a_role_by_one_node() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    let b = store.intern("b").expect("intern");
    let c = store.intern("c").expect("intern");
    common::put(&store, &a, &b, &a, &b);
    common::put(&store, &a, &b, &c, &c);
    let n = store.intern("n").expect("intern");

    let replaced = store.edges().with_object(&n).expect("with object");
    assert_eq!(replaced.objects().to_set().expect("set"), HashSet::from([n]));
    assert_eq!(replaced.size().expect("size"), 2);
    assert_eq!(replaced.subjects().to_set().expect("set"), HashSet::from([a, c]));
    // the stored edges are untouched
    assert_eq!(store.edges().having_object(&n).expect("having").size().expect("size"), 0);

    let empty = store.new_edges(Vec::new()).expect("empty set");
    assert_eq!(empty.with_object(&n).expect("with object").size().expect("size"), 0);
    assert_eq!(empty.with_context(&n).expect("with context").objects().size().expect("size"), 0);
}

#[test]
fn replacing_a_role_by_a_node_set() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    let b = store.intern("b").expect("intern");
    let c = store.intern("c").expect("intern");
    let d = store.intern("d").expect("intern");
    common::put(&store, &a, &b, &a, &b);
    common::put(&store, &a, &b, &c, &d);
    let n1 = store.new_node().expect("node");
    let n2 = store.new_node().expect("node");
    let replacements = store.new_nodes([n1, n2]).expect("node set");

    let replaced = store.edges().with_objects(&replacements).expect("with objects");
    assert_eq!(replaced.size().expect("size"), 4);
    assert_eq!(replaced.objects().to_set().expect("set"), HashSet::from([n1, n2]));

    let recontext = store.edges().with_contexts(&replacements).expect("with contexts");
    assert_eq!(recontext.contexts().to_set().expect("set"), HashSet::from([n1, n2]));
    assert_eq!(recontext.predicates().to_set().expect("set"), HashSet::from([b]));
}

#[test]
fn selecting_by_node_sets() {
    let store = common::store();
    let g = store.intern("g").expect("intern");
    let likes = store.intern("likes").expect("intern");
    let hates = store.intern("hates").expect("intern");
    let x = store.intern("x").expect("intern");
    let y = store.intern("y").expect("intern");
    let e1 = common::put(&store, &g, &likes, &x, &y);
    let e2 = common::put(&store, &g, &hates, &y, &x);
    common::put(&store, &g, &hates, &g, &g);

    let people = store.new_nodes([x, y]).expect("node set");
    let about_people = store.edges().having_subjects(&people).expect("having subjects");
    assert_eq!(about_people.to_set().expect("set"), HashSet::from([e1, e2]));

    let feelings = store.new_nodes([likes]).expect("node set");
    let liked = store.edges().having_predicates(&feelings).expect("having predicates");
    assert_eq!(liked.to_list().expect("list"), vec![e1]);

    let touching = store.edges().having_nodes(&people).expect("having nodes");
    assert_eq!(touching.size().expect("size"), 2);
    assert_eq!(store.edges().having_contexts(&people).expect("contexts").size().expect("size"), 0);
    let onto_subjects = store.edges().having_objects(&store.edges().subjects()).expect("objects");
    assert_eq!(onto_subjects.size().expect("size"), 3);
}

#[test]
fn having_state_splits_by_storage() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    let b = store.intern("b").expect("intern");
    let stored = common::put(&store, &a, &a, &a, &b);
    let loose = store.new_edge_with(&b, &b, &b, &a).expect("edge");
    let set = store.new_edges([stored, loose]).expect("edge set");
    assert_eq!(set.having_state(true).expect("stored").to_list().expect("list"), vec![stored]);
    assert_eq!(set.having_state(false).expect("loose").to_list().expect("list"), vec![loose]);
}

#[test]
fn only_materialized_edge_sets_take_indexes() {
    let store = common::store();
    let a = store.intern("a").expect("intern");
    common::put(&store, &a, &a, &a, &a);

    let frozen = store.edges().copy().expect("copy");
    frozen.index("OSPC").expect("index");
    frozen.index("OSPC").expect("index exists already");
    assert_eq!(frozen.size().expect("size"), 1);
    assert!(matches!(frozen.index("CPXO"), Err(QuadError::InvalidArgument(_))));
    assert!(matches!(store.edges().index("CPSO"), Err(QuadError::InvalidArgument(_))));
}
