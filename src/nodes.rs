// Operations of node, value and string sets.
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::construct::{Node, Value, key_at, text_at};
use crate::error::Result;
use crate::persist::QuadStore;
use crate::query::{Column, Condition, Literal, Plan, Query, Side, Source};
use crate::set::{Element, NodeSet, StringSet, ValueSet};

// ------------- Elements -------------
impl<'s> Element<'s> for Node<'s> {
    fn decode(store: &'s QuadStore, row: &[SqlValue]) -> Result<Self> {
        Ok(Node::new(store, key_at(row, 0)?))
    }
    fn encode(&self, row: &mut Vec<SqlValue>) {
        row.push(SqlValue::Integer(self.key()));
    }
    fn owner(&self) -> Option<&'s QuadStore> {
        Some(Node::owner(self))
    }
}

impl<'s> Element<'s> for Value<'s> {
    fn decode(store: &'s QuadStore, row: &[SqlValue]) -> Result<Self> {
        Ok(Value::new(store, key_at(row, 0)?, text_at(row, 1)?))
    }
    fn encode(&self, row: &mut Vec<SqlValue>) {
        row.push(SqlValue::Integer(self.node().key()));
        row.push(SqlValue::Text(self.string().to_owned()));
    }
    fn owner(&self) -> Option<&'s QuadStore> {
        Some(Value::owner(self))
    }
}

impl<'s> Element<'s> for String {
    fn decode(_store: &'s QuadStore, row: &[SqlValue]) -> Result<Self> {
        text_at(row, 0)
    }
    fn encode(&self, row: &mut Vec<SqlValue>) {
        row.push(SqlValue::Text(self.clone()));
    }
    fn owner(&self) -> Option<&'s QuadStore> {
        None
    }
}

// joins the rows of a set with the stored values on one column
fn join_values<'s>(
    set: &Rc<Plan<'s>>,
    column: usize,
    value_column: usize,
    columns: Vec<Side>,
) -> Plan<'s> {
    Plan::Join {
        left: Rc::clone(set),
        right: Rc::new(Plan::Scan(Source::Values)),
        on: vec![(column, value_column)],
        columns,
    }
}

// ------------- NodeSet -------------
impl<'s> NodeSet<'s> {
    /// The value assignments of the member nodes that carry a value.
    pub fn values(&self) -> ValueSet<'s> {
        self.derive(join_values(self.plan(), 0, 0, vec![Side::Right(0), Side::Right(1)]))
    }

    /// Nodes are stored implicitly through edges and values, so there is
    /// nothing to insert.
    pub fn put_all(&self) -> Result<bool> {
        Ok(false)
    }

    /// Removes the values of all member nodes and every edge using any of them.
    pub fn pop_all(&self) -> Result<bool> {
        // deleting edges could change a derived set while it is still needed
        let frozen = self.copy()?;
        let store = self.owner();
        let changed = store.atomically(|| {
            let mut edges = Query::new();
            edges.push("delete from Edge where ");
            let columns = ["Context", "Predicate", "Subject", "Object"];
            for (position, column) in columns.into_iter().enumerate() {
                if position > 0 {
                    edges.push(" or ");
                }
                edges.push(column).push(" in (").push_plan(frozen.plan()).push(")");
            }
            let mut nodes = Query::new();
            nodes
                .push("delete from Node where Node_Key in (")
                .push_plan(frozen.plan())
                .push(")");
            let edges_changed = edges.update(store)?;
            let nodes_changed = nodes.update(store)?;
            Ok(edges_changed | nodes_changed)
        })?;
        debug!(changed, "Popped nodes");
        Ok(changed)
    }
}

// ------------- ValueSet -------------
impl<'s> ValueSet<'s> {
    pub fn nodes(&self) -> NodeSet<'s> {
        self.project(vec![Column::Input(0)])
    }

    pub fn strings(&self) -> StringSet<'s> {
        self.project(vec![Column::Input(1)])
    }

    /// The values whose node is a member of the given set.
    pub fn with_nodes(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.check_same(nodes)?;
        Ok(self.filter(Condition::Within {
            columns: vec![0],
            set: Rc::clone(nodes.plan()),
        }))
    }

    /// The value with exactly this text, if it is a member.
    pub fn with_string(&self, string: &str) -> Self {
        self.filter(Condition::Equals {
            columns: vec![1],
            literal: Literal::Text(string.to_owned()),
        })
    }

    /// The values whose text is a member of the given set.
    pub fn with_strings(&self, strings: &StringSet<'s>) -> Result<Self> {
        self.check_same(strings)?;
        Ok(self.filter(Condition::Within {
            columns: vec![1],
            set: Rc::clone(strings.plan()),
        }))
    }

    pub fn having_state(&self, state: bool) -> Result<Self> {
        let stored = self.owner().values();
        if state {
            self.intersect(&stored)
        } else {
            self.except(&stored)
        }
    }

    /// Stores the values; a key or text that is already taken is skipped.
    pub fn put_all(&self) -> Result<bool> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query
            .push("insert or ignore into Node (Node_Key, Value) select C0, C1 from (")
            .push_plan(&plan)
            .push(")");
        let changed = query.update(self.owner())?;
        debug!(changed, "Put values");
        Ok(changed)
    }

    /// Removes the value rows only; edges are left alone.
    pub fn pop_all(&self) -> Result<bool> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query
            .push("delete from Node where (Node_Key, Value) in (select C0, C1 from (")
            .push_plan(&plan)
            .push("))");
        let changed = query.update(self.owner())?;
        debug!(changed, "Popped values");
        Ok(changed)
    }
}

// ------------- StringSet -------------
impl<'s> StringSet<'s> {
    /// The interned nodes carrying one of these strings.
    pub fn nodes(&self) -> NodeSet<'s> {
        self.derive(join_values(self.plan(), 0, 1, vec![Side::Right(0)]))
    }

    pub fn values(&self) -> ValueSet<'s> {
        self.derive(join_values(self.plan(), 0, 1, vec![Side::Right(0), Side::Right(1)]))
    }
}
