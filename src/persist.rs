// used for persistence
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info, trace, warn};

use crate::config::StoreConfig;
use crate::construct::{Edge, Key, Names, Node, Tuple};
use crate::error::{QuadError, Result};
use crate::query::{
    ColumnKind, EDGE_KINDS, NODE_KINDS, Plan, Query, STRING_KINDS, Source, VALUE_KINDS,
};
use crate::set::{EdgeSet, Element, NodeSet, QuerySet, StringSet, ValueSet};
use crate::tuples::TupleSet;

const SCHEMA: &str = "
    create table if not exists Node (
        Node_Key integer not null,
        Value text not null,
        constraint referenceable_Node_Key primary key (
            Node_Key
        ),
        constraint unique_Value unique (
            Value
        )
    );
    create table if not exists Edge (
        Context integer not null,
        Predicate integer not null,
        Subject integer not null,
        Object integer not null,
        constraint unique_Edge primary key (
            Context,
            Predicate,
            Subject,
            Object
        )
    ) without rowid;
    create index if not exists Edge_by_Context_Predicate_Object on Edge (
        Context, Predicate, Object, Subject
    );
    create index if not exists Edge_by_Context_Subject_Predicate on Edge (
        Context, Subject, Predicate, Object
    );
    create index if not exists Edge_by_Context_Object_Predicate on Edge (
        Context, Object, Predicate, Subject
    );
    create table if not exists Sequence (
        Name text not null,
        Value integer not null,
        constraint referenceable_Name primary key (
            Name
        )
    );
    insert or ignore into Sequence (Name, Value) values ('Node', 0);
    insert or ignore into Sequence (Name, Value) values ('Temp', 0);
";

const NEXT_KEY: &str = "
    update Sequence
        set Value = Value + 1
        where Name = ?
        returning Value
";

// ------------- Temporary tables -------------
/// Owns one ephemeral table of a store. The table is dropped together with
/// the last set referencing it, or when the store is closed.
pub struct TempTable<'s> {
    store: &'s QuadStore,
    name: String,
    kinds: Vec<ColumnKind>,
}

impl<'s> TempTable<'s> {
    pub(crate) fn store(&self) -> &'s QuadStore {
        self.store
    }
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
    pub(crate) fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }
}

impl Drop for TempTable<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.store.drop_temp(&self.name) {
            warn!(table = %self.name, error = %err, "Could not drop temporary table");
        }
    }
}

// ------------- Store -------------
/// A quad store on top of one SQLite connection.
///
/// The store is a single-owner handle: nodes, edges and sets borrow it, so it
/// cannot be closed or moved while any of them are alive.
pub struct QuadStore {
    db: Connection,
    config: StoreConfig,
    // names of the temporary tables that have not been dropped yet
    temporaries: RefCell<HashSet<String>>,
}

impl QuadStore {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let connection = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Self::from_connection(connection, config.clone())
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Wraps an existing connection, creating the schema if necessary.
    pub fn from_connection(connection: Connection, config: StoreConfig) -> Result<Self> {
        let config = config.sanitized();
        connection.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
        connection.execute_batch("PRAGMA synchronous = NORMAL;")?;
        if config.path.is_some() {
            // answers with the mode actually in effect
            let mode: String = connection.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
            debug!(%mode, "Journal mode");
        }
        connection.execute_batch(SCHEMA)?;
        info!(path = ?config.path, "Quad store opened");
        Ok(Self {
            db: connection,
            config,
            temporaries: RefCell::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Drops every temporary table that is still alive and closes the connection.
    pub fn close(self) -> Result<()> {
        let names: Vec<String> = self.temporaries.borrow_mut().drain().collect();
        for name in &names {
            self.db.execute_batch(&format!("drop table if exists temp.{name}"))?;
        }
        info!(dropped = names.len(), "Quad store closed");
        self.db.close().map_err(|(_, err)| QuadError::Storage(err))
    }

    /// Removes all nodes and edges and restarts the node counter.
    pub fn reset(&self) -> Result<()> {
        self.atomically(|| {
            self.db.execute_batch(
                "delete from Edge; delete from Node;
                 update Sequence set Value = 0 where Name = 'Node';",
            )?;
            Ok(())
        })?;
        info!("Quad store reset");
        Ok(())
    }

    /// Removes all valued nodes that no stored edge references.
    pub fn compact(&self) -> Result<bool> {
        self.nodes().except(&self.edges().nodes())?.pop_all()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.db
    }

    pub(crate) fn same(&self, other: &QuadStore) -> bool {
        std::ptr::eq(self, other)
    }

    pub(crate) fn check_owner(&self, other: &QuadStore) -> Result<()> {
        if self.same(other) {
            Ok(())
        } else {
            Err(QuadError::invalid("the argument belongs to a different store"))
        }
    }

    /// Runs the work inside a savepoint, rolling back when it fails.
    pub(crate) fn atomically<T>(&self, work: impl FnOnce() -> Result<T>) -> Result<T> {
        self.db.execute_batch("savepoint quadstore")?;
        match work() {
            Ok(result) => {
                self.db.execute_batch("release quadstore")?;
                Ok(result)
            }
            Err(err) => {
                let rollback = self.db.execute_batch("rollback to quadstore; release quadstore");
                if let Err(rollback) = rollback {
                    warn!(error = %rollback, "Could not roll back savepoint");
                }
                Err(err)
            }
        }
    }

    fn next_key(&self, sequence: &str) -> Result<Key> {
        let mut statement = self.db.prepare_cached(NEXT_KEY)?;
        Ok(statement.query_row(params![sequence], |r| r.get(0))?)
    }

    // ------------- Views on the stored content -------------
    pub fn edges(&self) -> EdgeSet<'_> {
        QuerySet::new(self, Plan::Scan(Source::Edges))
    }

    /// All nodes carrying a value.
    pub fn nodes(&self) -> NodeSet<'_> {
        QuerySet::new(self, Plan::Scan(Source::Nodes))
    }

    pub fn values(&self) -> ValueSet<'_> {
        QuerySet::new(self, Plan::Scan(Source::Values))
    }

    // ------------- Nodes -------------
    /// A node with a fresh key. Nothing is stored until it is used in an edge.
    pub fn new_node(&self) -> Result<Node<'_>> {
        Ok(Node::new(self, self.next_key("Node")?))
    }

    /// The node carrying the given value, if there is one.
    pub fn get_node(&self, value: &str) -> Result<Option<Node<'_>>> {
        let mut statement = self.db.prepare_cached("select Node_Key from Node where Value = ?")?;
        let key: Option<Key> = statement.query_row(params![value], |r| r.get(0)).optional()?;
        Ok(key.map(|key| Node::new(self, key)))
    }

    /// The node carrying the given value, created and stored when missing.
    ///
    /// The insert ignores a conflicting value and the key is read back
    /// afterwards, so concurrent connections interning the same value end up
    /// with the same key.
    pub fn intern(&self, value: &str) -> Result<Node<'_>> {
        if value.is_empty() {
            return Err(QuadError::invalid("node values must not be empty"));
        }
        if let Some(node) = self.get_node(value)? {
            return Ok(node);
        }
        let key = self.atomically(|| {
            let key = self.next_key("Node")?;
            let mut insert = self.db.prepare_cached(
                "insert into Node (Node_Key, Value) values (?, ?) on conflict (Value) do nothing",
            )?;
            insert.execute(params![key, value])?;
            let mut select = self.db.prepare_cached("select Node_Key from Node where Value = ?")?;
            Ok(select.query_row(params![value], |r| r.get::<_, Key>(0))?)
        })?;
        debug!(key, value, "Interned node");
        Ok(Node::new(self, key))
    }

    pub(crate) fn node_value(&self, key: Key) -> Result<Option<String>> {
        let mut statement = self.db.prepare_cached("select Value from Node where Node_Key = ?")?;
        Ok(statement.query_row(params![key], |r| r.get(0)).optional()?)
    }

    pub(crate) fn pop_node(&self, key: Key) -> Result<bool> {
        self.atomically(|| {
            let mut edges = self.db.prepare_cached(
                "delete from Edge
                 where Context = ?1 or Predicate = ?1 or Subject = ?1 or Object = ?1",
            )?;
            let mut node = self.db.prepare_cached("delete from Node where Node_Key = ?")?;
            let changed = edges.execute(params![key])? + node.execute(params![key])?;
            Ok(changed != 0)
        })
    }

    pub(crate) fn node_state(&self, key: Key) -> Result<bool> {
        let mut statement = self.db.prepare_cached(
            "select exists (select 1 from Node where Node_Key = ?1)
                or exists (select 1 from Edge
                    where Context = ?1 or Predicate = ?1 or Subject = ?1 or Object = ?1)",
        )?;
        Ok(statement.query_row(params![key], |r| r.get(0))?)
    }

    pub fn new_nodes<'a, I>(&'a self, nodes: I) -> Result<NodeSet<'a>>
    where
        I: IntoIterator<Item = Node<'a>>,
    {
        let table = self.collect_items(&NODE_KINDS, nodes.into_iter().map(Ok))?;
        Ok(QuerySet::new(self, Plan::Scan(Source::Temp(table))))
    }

    // ------------- Edges -------------
    /// An edge with a freshly allocated key in all four roles.
    pub fn new_edge(&self) -> Result<Edge<'_>> {
        let key = self.next_key("Node")?;
        Ok(Edge::new(self, [key; 4]))
    }

    /// An edge with the given node in all four roles.
    pub fn new_edge_of<'a>(&'a self, node: &Node<'a>) -> Result<Edge<'a>> {
        self.check_owner(node.owner())?;
        Ok(Edge::new(self, [node.key(); 4]))
    }

    pub fn new_edge_with<'a>(
        &'a self,
        context: &Node<'a>,
        predicate: &Node<'a>,
        subject: &Node<'a>,
        object: &Node<'a>,
    ) -> Result<Edge<'a>> {
        for node in [context, predicate, subject, object] {
            self.check_owner(node.owner())?;
        }
        Ok(Edge::new(self, [context.key(), predicate.key(), subject.key(), object.key()]))
    }

    pub fn new_edges<'a, I>(&'a self, edges: I) -> Result<EdgeSet<'a>>
    where
        I: IntoIterator<Item = Edge<'a>>,
    {
        let table = self.collect_items(&EDGE_KINDS, edges.into_iter().map(Ok))?;
        Edge::prepare_table(&table)?;
        Ok(QuerySet::new(self, Plan::Scan(Source::Temp(table))))
    }

    pub(crate) fn put_edge(&self, keys: [Key; 4]) -> Result<bool> {
        let mut statement = self.db.prepare_cached(
            "insert or ignore into Edge (Context, Predicate, Subject, Object) values (?, ?, ?, ?)",
        )?;
        Ok(statement.execute(params![keys[0], keys[1], keys[2], keys[3]])? != 0)
    }

    pub(crate) fn pop_edge(&self, keys: [Key; 4]) -> Result<bool> {
        let mut statement = self.db.prepare_cached(
            "delete from Edge where Context = ? and Predicate = ? and Subject = ? and Object = ?",
        )?;
        Ok(statement.execute(params![keys[0], keys[1], keys[2], keys[3]])? != 0)
    }

    pub(crate) fn edge_state(&self, keys: [Key; 4]) -> Result<bool> {
        let mut statement = self.db.prepare_cached(
            "select exists (select 1 from Edge
                where Context = ? and Predicate = ? and Subject = ? and Object = ?)",
        )?;
        Ok(statement.query_row(params![keys[0], keys[1], keys[2], keys[3]], |r| r.get(0))?)
    }

    // ------------- Values -------------
    pub fn new_values<'a, I>(&'a self, values: I) -> Result<ValueSet<'a>>
    where
        I: IntoIterator<Item = crate::construct::Value<'a>>,
    {
        let table = self.collect_items(&VALUE_KINDS, values.into_iter().map(Ok))?;
        Ok(QuerySet::new(self, Plan::Scan(Source::Temp(table))))
    }

    pub fn new_strings<I, S>(&self, strings: I) -> Result<StringSet<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = strings.into_iter().map(|s| Ok(s.as_ref().to_owned()));
        let table = self.collect_items(&STRING_KINDS, items)?;
        Ok(QuerySet::new(self, Plan::Scan(Source::Temp(table))))
    }

    pub(crate) fn pop_value(&self, key: Key, value: &str) -> Result<bool> {
        let mut statement =
            self.db.prepare_cached("delete from Node where Node_Key = ? and Value = ?")?;
        Ok(statement.execute(params![key, value])? != 0)
    }

    pub(crate) fn value_state(&self, key: Key, value: &str) -> Result<bool> {
        let mut statement = self
            .db
            .prepare_cached("select exists (select 1 from Node where Node_Key = ? and Value = ?)")?;
        Ok(statement.query_row(params![key, value], |r| r.get(0))?)
    }

    // ------------- Tuples -------------
    pub fn new_tuple<'a>(&'a self, nodes: &[Node<'a>]) -> Result<Tuple<'a>> {
        if nodes.is_empty() {
            return Err(QuadError::invalid("a tuple needs at least one node"));
        }
        for node in nodes {
            self.check_owner(node.owner())?;
        }
        Ok(Tuple::new(self, nodes.iter().map(Node::key).collect()))
    }

    pub fn new_tuples<'a, S, I>(&'a self, names: &[S], tuples: I) -> Result<TupleSet<'a>>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Tuple<'a>>,
    {
        let names = Names::new(names)?;
        let kinds = vec![ColumnKind::Key; names.len()];
        let table = self.collect_items(&kinds, tuples.into_iter().map(Ok))?;
        Ok(TupleSet::new(QuerySet::new(self, Plan::Scan(Source::Temp(table))), names))
    }

    /// Groups the nodes into consecutive tuples with one node per role name.
    pub fn new_tuples_flat<'a, S>(&'a self, names: &[S], nodes: &[Node<'a>]) -> Result<TupleSet<'a>>
    where
        S: AsRef<str>,
    {
        let width = Names::new(names)?.len();
        if nodes.len() % width != 0 {
            return Err(QuadError::invalid(format!(
                "{} nodes cannot be grouped into tuples of {width}",
                nodes.len()
            )));
        }
        let tuples = nodes
            .chunks(width)
            .map(|chunk| self.new_tuple(chunk))
            .collect::<Result<Vec<_>>>()?;
        self.new_tuples(names, tuples)
    }

    // ------------- Materialization -------------
    pub(crate) fn create_temp(&self, kinds: &[ColumnKind]) -> Result<Rc<TempTable<'_>>> {
        let name = format!("QT{}", self.next_key("Temp")?);
        let mut query = Query::new();
        query.push("create temp table ").push(&name).push(" (");
        for (index, kind) in kinds.iter().enumerate() {
            if index > 0 {
                query.push(", ");
            }
            query.push("C").push_int(index as i64).push(" ").push(kind.declaration());
        }
        query.push(")");
        self.db.execute_batch(query.sql())?;
        self.temporaries.borrow_mut().insert(name.clone());
        trace!(table = %name, "Created temporary table");
        Ok(Rc::new(TempTable {
            store: self,
            name,
            kinds: kinds.to_vec(),
        }))
    }

    /// Drops the table if it is still registered; a name is dropped at most once.
    pub(crate) fn drop_temp(&self, name: &str) -> Result<()> {
        if self.temporaries.borrow_mut().remove(name) {
            self.db.execute_batch(&format!("drop table if exists temp.{name}"))?;
            trace!(table = %name, "Dropped temporary table");
        }
        Ok(())
    }

    /// Copies the rows of a plan into a fresh temporary table.
    pub(crate) fn materialize(&self, plan: &Plan<'_>) -> Result<Rc<TempTable<'_>>> {
        let table = self.create_temp(&plan.kinds())?;
        let mut query = Query::new();
        query
            .push("insert into ")
            .push(table.name())
            .push(" select distinct * from (")
            .push_plan(plan)
            .push(")");
        query.update(self)?;
        Ok(table)
    }

    /// Batch-inserts the items into a private buffer table, then copies the
    /// distinct rows into the table that is returned.
    pub(crate) fn collect_items<'a, E, I>(
        &'a self,
        kinds: &[ColumnKind],
        items: I,
    ) -> Result<Rc<TempTable<'a>>>
    where
        E: Element<'a>,
        I: IntoIterator<Item = Result<E>>,
    {
        let buffer = self.create_temp(kinds)?;
        let mut count = 0usize;
        self.atomically(|| {
            let mut insert = Query::new();
            insert.push("insert into ").push(buffer.name()).push(" values (");
            for index in 0..kinds.len() {
                insert.push(if index == 0 { "?" } else { ", ?" });
            }
            insert.push(")");
            let mut statement = self.db.prepare(insert.sql())?;
            let mut row: Vec<SqlValue> = Vec::with_capacity(kinds.len());
            for item in items {
                let item = item?;
                if let Some(owner) = item.owner() {
                    self.check_owner(owner)?;
                }
                row.clear();
                item.encode(&mut row);
                if row.len() != kinds.len() {
                    return Err(QuadError::invalid(format!(
                        "expected {} columns per item, got {}",
                        kinds.len(),
                        row.len()
                    )));
                }
                statement.execute(params_from_iter(row.iter()))?;
                count += 1;
            }
            Ok(())
        })?;
        let table = self.create_temp(kinds)?;
        let mut copy = Query::new();
        copy.push("insert into ")
            .push(table.name())
            .push(" select distinct * from ")
            .push(buffer.name());
        copy.update(self)?;
        debug!(table = %table.name(), rows = count, "Collected items");
        Ok(table)
    }
}
