mod common;

use std::fs;
use std::path::PathBuf;

use quadstore::{QuadStore, StoreConfig};

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("quadstore-{}-{name}", std::process::id()))
}

#[test]
fn missing_file_yields_defaults() {
    let config = StoreConfig::load(scratch("absent.toml")).expect("defaults");
    assert_eq!(config.path, None);
    assert_eq!(config.fetch_size, 512);
    assert_eq!(config.statement_cache_capacity, 64);
    assert!(config.index_materialized_edges);
    assert_eq!(config.max_plan_depth, 64);
}

#[test]
fn file_values_override_defaults() {
    let file = scratch("settings.toml");
    let settings = "fetch_size = 0\nindex_materialized_edges = false\nmax_plan_depth = 0\n";
    fs::write(&file, settings).expect("write config");
    let config = StoreConfig::load(&file).expect("load");
    fs::remove_file(&file).expect("clean up");
    assert_eq!(config.fetch_size, 1, "a zero page size is raised to one");
    assert!(!config.index_materialized_edges);
    assert_eq!(config.max_plan_depth, 1, "a zero depth is raised to one");
    assert_eq!(config.statement_cache_capacity, 64);
}

#[test]
fn file_stores_survive_reopening() {
    common::init_tracing();
    let path = scratch("store.db");
    let config = StoreConfig::file(&path);
    let key = {
        let store = QuadStore::open(&config).expect("open");
        let alice = store.intern("alice").expect("intern");
        common::put(&store, &alice, &alice, &alice, &alice);
        let key = alice.key();
        store.close().expect("close");
        key
    };
    {
        let store = QuadStore::open(&config).expect("reopen");
        let alice = store.get_node("alice").expect("lookup").expect("persisted");
        assert_eq!(alice.key(), key);
        assert_eq!(store.edges().size().expect("size"), 1);
        assert_ne!(store.new_node().expect("node").key(), key, "the counter is persisted too");
        store.close().expect("close");
    }
    for suffix in ["", "-wal", "-shm"] {
        let _ = fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[test]
fn existing_connections_get_the_schema() {
    common::init_tracing();
    let connection = rusqlite::Connection::open_in_memory().expect("connection");
    let store = QuadStore::from_connection(connection, StoreConfig::default()).expect("wrap");
    assert_eq!(store.config().fetch_size, 512);
    assert_eq!(store.intern("x").expect("intern").key(), 1);
}
