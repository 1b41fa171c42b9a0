// Operations of edge sets.
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::construct::{Edge, Names, Node, Role, key_at};
use crate::error::{QuadError, Result};
use crate::persist::{QuadStore, TempTable};
use crate::query::{Column, Condition, Literal, Plan, Query, SetOperator, Side};
use crate::set::{EdgeSet, Element, NodeSet};
use crate::tuples::TupleSet;

// index orders every materialized edge set gets when configured to
const DEFAULT_ORDERS: [&str; 4] = ["CPSO", "CPOS", "CSPO", "COPS"];

impl<'s> Element<'s> for Edge<'s> {
    fn decode(store: &'s QuadStore, row: &[SqlValue]) -> Result<Self> {
        Ok(Edge::new(
            store,
            [key_at(row, 0)?, key_at(row, 1)?, key_at(row, 2)?, key_at(row, 3)?],
        ))
    }
    fn encode(&self, row: &mut Vec<SqlValue>) {
        row.extend(self.keys().map(SqlValue::Integer));
    }
    fn owner(&self) -> Option<&'s QuadStore> {
        Some(Edge::owner(self))
    }
    fn prepare_table(table: &TempTable<'s>) -> Result<()> {
        if table.store().config().index_materialized_edges {
            for order in DEFAULT_ORDERS {
                create_index(table, &parse_order(order)?)?;
            }
        }
        Ok(())
    }
}

fn parse_order(order: &str) -> Result<[Role; 4]> {
    let roles: Vec<Role> = order.chars().filter_map(Role::from_letter).collect();
    let complete = |roles: &[Role; 4]| Role::ALL.iter().all(|role| roles.contains(role));
    match <[Role; 4]>::try_from(roles) {
        Ok(roles) if order.len() == 4 && complete(&roles) => Ok(roles),
        _ => Err(QuadError::invalid(format!("'{order}' is not a permutation of CPSO"))),
    }
}

fn create_index(table: &TempTable<'_>, roles: &[Role; 4]) -> Result<()> {
    let suffix: String = roles.iter().map(|role| role.letter()).collect();
    let mut query = Query::new();
    query
        .push("create index if not exists ")
        .push(table.name())
        .push("_INDEX_")
        .push(&suffix)
        .push(" on ")
        .push(table.name())
        .push(" (");
    for (position, role) in roles.iter().enumerate() {
        if position > 0 {
            query.push(", ");
        }
        query.push("C").push_int(role.column() as i64);
    }
    query.push(")");
    query.update(table.store())?;
    Ok(())
}

impl<'s> EdgeSet<'s> {
    /// Inserts every edge of this set; present edges are left alone.
    pub fn put_all(&self) -> Result<bool> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query
            .push("insert or ignore into Edge (Context, Predicate, Subject, Object) ")
            .push("select C0, C1, C2, C3 from (")
            .push_plan(&plan)
            .push(")");
        let changed = query.update(self.owner())?;
        debug!(changed, "Put edges");
        Ok(changed)
    }

    pub fn pop_all(&self) -> Result<bool> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query
            .push("delete from Edge where (Context, Predicate, Subject, Object) in ")
            .push("(select C0, C1, C2, C3 from (")
            .push_plan(&plan)
            .push("))");
        let changed = query.update(self.owner())?;
        debug!(changed, "Popped edges");
        Ok(changed)
    }

    pub fn role_nodes(&self, role: Role) -> NodeSet<'s> {
        self.project(vec![Column::Input(role.column())])
    }
    pub fn contexts(&self) -> NodeSet<'s> {
        self.role_nodes(Role::Context)
    }
    pub fn predicates(&self) -> NodeSet<'s> {
        self.role_nodes(Role::Predicate)
    }
    pub fn subjects(&self) -> NodeSet<'s> {
        self.role_nodes(Role::Subject)
    }
    pub fn objects(&self) -> NodeSet<'s> {
        self.role_nodes(Role::Object)
    }

    /// Every node used by these edges in any role.
    pub fn nodes(&self) -> NodeSet<'s> {
        let project = |role: Role| {
            Rc::new(Plan::Project {
                input: Rc::clone(self.plan()),
                columns: vec![Column::Input(role.column())],
            })
        };
        let plan = [Role::Predicate, Role::Subject, Role::Object]
            .into_iter()
            .fold(project(Role::Context), |left, role| {
                Rc::new(Plan::Compound {
                    operator: SetOperator::Union,
                    left,
                    right: project(role),
                })
            });
        NodeSet::shared(self.owner(), plan)
    }

    // ------------- selection -------------
    fn having_key(&self, columns: Vec<usize>, node: &Node<'s>) -> Result<Self> {
        self.owner().check_owner(node.owner())?;
        Ok(self.filter(Condition::Equals {
            columns,
            literal: Literal::Key(node.key()),
        }))
    }

    fn having_keys(&self, columns: Vec<usize>, nodes: &NodeSet<'s>) -> Result<Self> {
        self.check_same(nodes)?;
        Ok(self.filter(Condition::Within {
            columns,
            set: Rc::clone(nodes.plan()),
        }))
    }

    pub fn having_role(&self, role: Role, node: &Node<'s>) -> Result<Self> {
        self.having_key(vec![role.column()], node)
    }
    pub fn having_roles(&self, role: Role, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_keys(vec![role.column()], nodes)
    }
    pub fn having_context(&self, node: &Node<'s>) -> Result<Self> {
        self.having_role(Role::Context, node)
    }
    pub fn having_contexts(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_roles(Role::Context, nodes)
    }
    pub fn having_predicate(&self, node: &Node<'s>) -> Result<Self> {
        self.having_role(Role::Predicate, node)
    }
    pub fn having_predicates(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_roles(Role::Predicate, nodes)
    }
    pub fn having_subject(&self, node: &Node<'s>) -> Result<Self> {
        self.having_role(Role::Subject, node)
    }
    pub fn having_subjects(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_roles(Role::Subject, nodes)
    }
    pub fn having_object(&self, node: &Node<'s>) -> Result<Self> {
        self.having_role(Role::Object, node)
    }
    pub fn having_objects(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_roles(Role::Object, nodes)
    }

    /// Edges using the node in any role.
    pub fn having_node(&self, node: &Node<'s>) -> Result<Self> {
        self.having_key(vec![0, 1, 2, 3], node)
    }
    pub fn having_nodes(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_keys(vec![0, 1, 2, 3], nodes)
    }

    /// The edges of this set that are (or are not) currently stored.
    pub fn having_state(&self, state: bool) -> Result<Self> {
        let stored = self.owner().edges();
        if state {
            self.intersect(&stored)
        } else {
            self.except(&stored)
        }
    }

    // ------------- replacement -------------
    pub fn with_role(&self, role: Role, node: &Node<'s>) -> Result<Self> {
        self.owner().check_owner(node.owner())?;
        let columns = Role::ALL
            .into_iter()
            .map(|other| {
                if other == role {
                    Column::Constant(node.key())
                } else {
                    Column::Input(other.column())
                }
            })
            .collect();
        Ok(self.project(columns))
    }

    /// Each edge once for every node of the set, with the role replaced.
    pub fn with_roles(&self, role: Role, nodes: &NodeSet<'s>) -> Result<Self> {
        self.check_same(nodes)?;
        let columns = Role::ALL
            .into_iter()
            .map(|other| {
                if other == role {
                    Side::Right(0)
                } else {
                    Side::Left(other.column())
                }
            })
            .collect();
        Ok(self.derive(Plan::Join {
            left: Rc::clone(self.plan()),
            right: Rc::clone(nodes.plan()),
            on: Vec::new(),
            columns,
        }))
    }

    pub fn with_context(&self, node: &Node<'s>) -> Result<Self> {
        self.with_role(Role::Context, node)
    }
    pub fn with_contexts(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.with_roles(Role::Context, nodes)
    }
    pub fn with_predicate(&self, node: &Node<'s>) -> Result<Self> {
        self.with_role(Role::Predicate, node)
    }
    pub fn with_predicates(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.with_roles(Role::Predicate, nodes)
    }
    pub fn with_subject(&self, node: &Node<'s>) -> Result<Self> {
        self.with_role(Role::Subject, node)
    }
    pub fn with_subjects(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.with_roles(Role::Subject, nodes)
    }
    pub fn with_object(&self, node: &Node<'s>) -> Result<Self> {
        self.with_role(Role::Object, node)
    }
    pub fn with_objects(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.with_roles(Role::Object, nodes)
    }

    // ------------- reshaping -------------
    /// The edges as tuples with the given role names for context, predicate,
    /// subject and object.
    pub fn tuples(
        &self,
        context: &str,
        predicate: &str,
        subject: &str,
        object: &str,
    ) -> Result<TupleSet<'s>> {
        let names = Names::new(&[context, predicate, subject, object])?;
        Ok(TupleSet::new(self.cast(), names))
    }

    /// Adds a covering index in the given role order, e.g. "CPOS", to this
    /// materialized set.
    pub fn index(&self, order: &str) -> Result<()> {
        let roles = parse_order(order)?;
        match self.plan().temp() {
            Some(table) => create_index(table, &roles),
            None => Err(QuadError::invalid("only materialized edge sets can be indexed")),
        }
    }
}
