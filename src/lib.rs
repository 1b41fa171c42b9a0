//! Quadstore – a graph store for quads on top of SQLite.
//!
//! The store keeps a hypergraph of fourth order:
//! * A [`construct::Node`] is an opaque identity (an `i64` key) that may carry
//!   one interned text value. Two nodes with the same text have the same key.
//! * A [`construct::Edge`] (a quad) connects four nodes in the roles context,
//!   predicate, subject and object.
//! * A [`construct::Value`] pairs a node with its text.
//! * A [`construct::Tuple`] is a row of nodes whose role names live on the
//!   [`tuples::TupleSet`] containing it.
//!
//! Sets of these entities form a lazy algebra: selection (`having_*`),
//! replacement (`with_*`), projection, `union`/`except`/`intersect`, `join`
//! and ordering only describe a result. The description is rendered into a
//! single SQL statement when a terminal operation (`size`, `iter`, `copy`,
//! `put_all`, `pop_all` ...) runs.
//!
//! ## Modules
//! * [`construct`] – Entities, roles and tuple role names.
//! * [`set`] – The generic [`set::QuerySet`] with the operations shared by all sets.
//! * [`edges`], [`nodes`], [`tuples`] – The operations specific to each element kind.
//! * [`persist`] – The [`persist::QuadStore`] engine: schema, interning,
//!   bulk construction and ephemeral tables.
//! * [`config`] – [`config::StoreConfig`], loadable through the `config` crate.
//!
//! ## Ephemeral tables
//! Sets built from in-memory items, and every `copy()`, are backed by a
//! temporary table. The table is dropped as soon as the last set referring to
//! it goes away, and [`persist::QuadStore::close`] drops whatever is left.
//!
//! ## Quick Start
//! ```
//! use quadstore::persist::QuadStore;
//! let store = QuadStore::in_memory().unwrap();
//! let alice = store.intern("alice").unwrap();
//! let bob = store.intern("bob").unwrap();
//! store.new_edge_with(&alice, &bob, &alice, &bob).unwrap().put().unwrap();
//! let edges = store.edges();
//! assert_eq!(edges.having_object(&bob).unwrap().size().unwrap(), 1);
//! assert_eq!(edges.subjects().to_list().unwrap(), vec![alice]);
//! ```
//!
//! ## Logging
//! Events are emitted through `tracing`; install any subscriber to see the
//! rendered statements at `debug` level.

pub mod config;
pub mod construct;
pub mod edges;
pub mod error;
pub mod nodes;
pub mod persist;
mod query;
pub mod set;
pub mod tuples;

pub use crate::config::StoreConfig;
pub use construct::{Edge, Key, Names, Node, Role, RoleRef, Tuple, Value};
pub use error::{QuadError, Result};
pub use persist::QuadStore;
pub use set::{Cursor, EdgeSet, Element, NodeSet, QuerySet, StringSet, ValueSet};
pub use tuples::TupleSet;
