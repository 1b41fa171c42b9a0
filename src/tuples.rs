//! Tuple sets: rows of nodes with named roles.
//!
//! All tuples of one [`TupleSet`] share the arity and the role names, so the
//! names are kept on the set. Roles can be addressed by position or by name,
//! see [`RoleRef`].

use std::collections::HashSet;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;

use crate::construct::{Names, Node, RoleRef, Tuple, key_at};
use crate::error::{QuadError, Result};
use crate::persist::QuadStore;
use crate::query::{Column, Condition, Literal, Plan, Side};
use crate::set::{Cursor, EdgeSet, Element, NodeSet, QuerySet};

impl<'s> Element<'s> for Tuple<'s> {
    fn decode(store: &'s QuadStore, row: &[SqlValue]) -> Result<Self> {
        let keys = (0..row.len()).map(|index| key_at(row, index)).collect::<Result<_>>()?;
        Ok(Tuple::new(store, keys))
    }
    fn encode(&self, row: &mut Vec<SqlValue>) {
        row.extend(self.keys().iter().map(|key| SqlValue::Integer(*key)));
    }
    fn owner(&self) -> Option<&'s QuadStore> {
        Some(Tuple::owner(self))
    }
}

#[derive(Clone, Debug)]
pub struct TupleSet<'s> {
    set: QuerySet<'s, Tuple<'s>>,
    names: Names,
}

impl<'s> TupleSet<'s> {
    pub(crate) fn new(set: QuerySet<'s, Tuple<'s>>, names: Names) -> Self {
        Self { set, names }
    }

    fn with_set(&self, set: QuerySet<'s, Tuple<'s>>) -> Self {
        Self::new(set, self.names.clone())
    }

    fn check_names(&self, other: &TupleSet<'s>) -> Result<()> {
        if self.names == other.names {
            Ok(())
        } else {
            Err(QuadError::invalid(format!(
                "role names {:?} differ from {:?}",
                other.names.as_slice(),
                self.names.as_slice()
            )))
        }
    }

    // ------------- names -------------
    pub fn names(&self) -> &Names {
        &self.names
    }
    pub fn role(&self, name: &str) -> Option<usize> {
        self.names.role(name)
    }
    pub fn roles<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                let name: &str = name.as_ref();
                name.resolve(&self.names)
            })
            .collect()
    }
    pub fn name(&self, role: usize) -> Result<&str> {
        self.names.name(role)
    }
    pub fn names_of(&self, roles: &[usize]) -> Result<Vec<String>> {
        roles
            .iter()
            .map(|role| self.names.name(*role).map(str::to_owned))
            .collect()
    }

    // ------------- uniform operations -------------
    pub fn owner(&self) -> &'s QuadStore {
        self.set.owner()
    }
    pub fn size(&self) -> Result<usize> {
        self.set.size()
    }
    pub fn has_any(&self) -> Result<bool> {
        self.set.has_any()
    }
    pub fn union(&self, other: &TupleSet<'s>) -> Result<Self> {
        self.check_names(other)?;
        Ok(self.with_set(self.set.union(&other.set)?))
    }
    pub fn except(&self, other: &TupleSet<'s>) -> Result<Self> {
        self.check_names(other)?;
        Ok(self.with_set(self.set.except(&other.set)?))
    }
    pub fn intersect(&self, other: &TupleSet<'s>) -> Result<Self> {
        self.check_names(other)?;
        Ok(self.with_set(self.set.intersect(&other.set)?))
    }
    pub fn order(&self) -> Self {
        self.with_set(self.set.order())
    }
    pub fn copy(&self) -> Result<Self> {
        Ok(self.with_set(self.set.copy()?))
    }
    pub fn having<F>(&self, accept: F) -> Result<Self>
    where
        F: FnMut(&Tuple<'s>) -> bool,
    {
        Ok(self.with_set(self.set.having(accept)?))
    }
    pub fn iter(&self) -> Cursor<'s, Tuple<'s>> {
        self.set.iter()
    }
    pub fn to_list(&self) -> Result<Vec<Tuple<'s>>> {
        self.set.to_list()
    }
    pub fn to_set(&self) -> Result<HashSet<Tuple<'s>>> {
        self.set.to_set()
    }

    // ------------- projection -------------
    /// The nodes in one role.
    pub fn nodes(&self, role: impl RoleRef) -> Result<NodeSet<'s>> {
        let role = role.resolve(&self.names)?;
        Ok(self.set.project(vec![Column::Input(role)]))
    }

    /// Reads the given roles as context, predicate, subject and object.
    pub fn edges(
        &self,
        context: impl RoleRef,
        predicate: impl RoleRef,
        subject: impl RoleRef,
        object: impl RoleRef,
    ) -> Result<EdgeSet<'s>> {
        let columns = vec![
            Column::Input(context.resolve(&self.names)?),
            Column::Input(predicate.resolve(&self.names)?),
            Column::Input(subject.resolve(&self.names)?),
            Column::Input(object.resolve(&self.names)?),
        ];
        Ok(self.set.project(columns))
    }

    /// Keeps the given roles in the given order.
    pub fn select<R: RoleRef>(&self, roles: &[R]) -> Result<Self> {
        let roles = roles
            .iter()
            .map(|role| role.resolve(&self.names))
            .collect::<Result<Vec<_>>>()?;
        let names = Names::new(&self.names_of(&roles)?)?;
        let set = self.set.project(roles.into_iter().map(Column::Input).collect());
        Ok(Self::new(set, names))
    }

    /// The same tuples under new role names.
    pub fn with_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let names = Names::new(names)?;
        if names.len() != self.names.len() {
            return Err(QuadError::invalid(format!(
                "expected {} role names, got {}",
                self.names.len(),
                names.len()
            )));
        }
        Ok(Self::new(self.set.clone(), names))
    }

    /// Natural join on the role names both sets share; a cross product when
    /// they share none. The result has the roles of this set followed by the
    /// other roles of the given set.
    pub fn join(&self, other: &TupleSet<'s>) -> Result<Self> {
        self.set.check_same(&other.set)?;
        let mut on = Vec::new();
        let mut columns: Vec<Side> = (0..self.names.len()).map(Side::Left).collect();
        let mut names: Vec<String> = self.names.as_slice().to_vec();
        for (index, name) in other.names.as_slice().iter().enumerate() {
            match self.names.role(name) {
                Some(role) => on.push((role, index)),
                None => {
                    columns.push(Side::Right(index));
                    names.push(name.clone());
                }
            }
        }
        let set = self.set.derive(Plan::Join {
            left: Rc::clone(self.set.plan()),
            right: Rc::clone(other.set.plan()),
            on,
            columns,
        });
        Ok(Self::new(set, Names::new(&names)?))
    }

    // ------------- replacement -------------
    /// Replaces the role by the node in every tuple.
    pub fn with_node(&self, role: impl RoleRef, node: &Node<'s>) -> Result<Self> {
        let role = role.resolve(&self.names)?;
        self.owner().check_owner(node.owner())?;
        let columns = (0..self.names.len())
            .map(|index| {
                if index == role {
                    Column::Constant(node.key())
                } else {
                    Column::Input(index)
                }
            })
            .collect();
        Ok(self.with_set(self.set.project(columns)))
    }

    /// Every tuple once for each node of the set, with the role replaced.
    pub fn with_nodes(&self, role: impl RoleRef, nodes: &NodeSet<'s>) -> Result<Self> {
        let role = role.resolve(&self.names)?;
        self.set.check_same(nodes)?;
        let columns = (0..self.names.len())
            .map(|index| if index == role { Side::Right(0) } else { Side::Left(index) })
            .collect();
        Ok(self.with_set(self.set.derive(Plan::Join {
            left: Rc::clone(self.set.plan()),
            right: Rc::clone(nodes.plan()),
            on: Vec::new(),
            columns,
        })))
    }

    // ------------- selection -------------
    fn having_key(&self, columns: Vec<usize>, node: &Node<'s>) -> Result<Self> {
        self.owner().check_owner(node.owner())?;
        Ok(self.with_set(self.set.filter(Condition::Equals {
            columns,
            literal: Literal::Key(node.key()),
        })))
    }

    fn having_keys(&self, columns: Vec<usize>, nodes: &NodeSet<'s>) -> Result<Self> {
        self.set.check_same(nodes)?;
        Ok(self.with_set(self.set.filter(Condition::Within {
            columns,
            set: Rc::clone(nodes.plan()),
        })))
    }

    /// Tuples using the node in any role.
    pub fn having_node(&self, node: &Node<'s>) -> Result<Self> {
        self.having_key((0..self.names.len()).collect(), node)
    }
    pub fn having_nodes(&self, nodes: &NodeSet<'s>) -> Result<Self> {
        self.having_keys((0..self.names.len()).collect(), nodes)
    }
    pub fn having_role_node(&self, role: impl RoleRef, node: &Node<'s>) -> Result<Self> {
        let role = role.resolve(&self.names)?;
        self.having_key(vec![role], node)
    }
    pub fn having_role_nodes(&self, role: impl RoleRef, nodes: &NodeSet<'s>) -> Result<Self> {
        let role = role.resolve(&self.names)?;
        self.having_keys(vec![role], nodes)
    }
}

impl<'s> IntoIterator for &TupleSet<'s> {
    type Item = Result<Tuple<'s>>;
    type IntoIter = Cursor<'s, Tuple<'s>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
