mod common;

use quadstore::{QuadError, QuadStore};

fn invalid<T>(result: quadstore::Result<T>) -> bool {
    matches!(result, Err(QuadError::InvalidArgument(_)))
}

// Arguments owned by another store are rejected before anything is executed.
#[test]
fn foreign_arguments_are_rejected() {
    common::init_tracing();
    let home = QuadStore::in_memory().expect("home store");
    let away = QuadStore::in_memory().expect("away store");
    let local = home.intern("local").expect("intern");
    let foreign = away.intern("foreign").expect("intern");
    common::put(&home, &local, &local, &local, &local);
    common::put(&away, &foreign, &foreign, &foreign, &foreign);

    assert!(invalid(home.new_edge_with(&local, &foreign, &local, &local)));
    assert!(invalid(home.new_edge_of(&foreign)));
    assert!(invalid(home.new_tuple(&[local, foreign])));
    assert!(invalid(home.edges().union(&away.edges())));
    assert!(invalid(home.edges().having_object(&foreign)));
    assert!(invalid(home.edges().having_nodes(&away.nodes())));
    assert!(invalid(home.edges().with_subject(&foreign)));
    assert!(invalid(home.edges().with_subjects(&away.nodes())));
    assert!(invalid(home.values().with_nodes(&away.nodes())));
    assert!(invalid(home.values().with_strings(&away.values().strings())));

    let home_tuples = home.edges().tuples("c", "p", "s", "o").expect("tuples");
    let away_tuples = away.edges().tuples("c", "p", "s", "o").expect("tuples");
    assert!(invalid(home_tuples.join(&away_tuples)));
    assert!(invalid(home_tuples.intersect(&away_tuples)));
    assert!(invalid(home_tuples.having_node(&foreign)));
}

#[test]
fn rejected_bulk_input_leaves_no_trace() {
    common::init_tracing();
    let home = QuadStore::in_memory().expect("home store");
    let away = QuadStore::in_memory().expect("away store");
    let local = home.intern("local").expect("intern");
    let foreign = away.intern("foreign").expect("intern");
    let mixed_edges = [
        home.new_edge_of(&local).expect("edge"),
        away.new_edge_of(&foreign).expect("edge"),
    ];

    assert!(invalid(home.new_nodes([local, foreign])));
    assert!(invalid(home.new_edges(mixed_edges)));
    assert_eq!(home.edges().size().expect("size"), 0);
    assert_eq!(home.values().size().expect("size"), 1);
    // the store stays usable after the rollback
    let edges = home.new_edges([home.new_edge_of(&local).expect("edge")]).expect("edges");
    assert!(edges.put_all().expect("put"));
}
