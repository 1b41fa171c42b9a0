//! The generic core of the query algebra.
//!
//! A [`QuerySet`] is a store reference plus a shared [`Plan`]. Composing sets
//! only builds new plans; the backend is queried by the terminal operations
//! (`size`, `has_any`, `iter`, `copy`, `put_all`, `pop_all` ...). The typed
//! operations of each element kind live in the `edges`, `nodes` and `tuples`
//! modules.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;

use crate::construct::{Edge, Node, Value};
use crate::error::{QuadError, Result};
use crate::persist::{QuadStore, TempTable};
use crate::query::{Column, Condition, Plan, Query, SetOperator, Source};

/// An element that can be read from and written to the rows of a set.
pub trait Element<'s>: Sized {
    fn decode(store: &'s QuadStore, row: &[SqlValue]) -> Result<Self>;
    fn encode(&self, row: &mut Vec<SqlValue>);
    /// The store this element belongs to; plain strings belong to none.
    fn owner(&self) -> Option<&'s QuadStore>;
    /// Called once for every freshly materialized table of this element kind.
    fn prepare_table(_table: &TempTable<'s>) -> Result<()> {
        Ok(())
    }
}

pub type EdgeSet<'s> = QuerySet<'s, Edge<'s>>;
pub type NodeSet<'s> = QuerySet<'s, Node<'s>>;
pub type ValueSet<'s> = QuerySet<'s, Value<'s>>;
pub type StringSet<'s> = QuerySet<'s, String>;

pub struct QuerySet<'s, E> {
    store: &'s QuadStore,
    plan: Rc<Plan<'s>>,
    marker: PhantomData<fn() -> E>,
}

impl<E> Clone for QuerySet<'_, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            plan: Rc::clone(&self.plan),
            marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for QuerySet<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut query = Query::new();
        query.push_plan(&self.plan);
        f.debug_struct("QuerySet").field("sql", &query.sql()).finish()
    }
}

impl<'s, E: Element<'s>> QuerySet<'s, E> {
    pub(crate) fn new(store: &'s QuadStore, plan: Plan<'s>) -> Self {
        Self::shared(store, Rc::new(plan))
    }

    pub(crate) fn shared(store: &'s QuadStore, plan: Rc<Plan<'s>>) -> Self {
        Self {
            store,
            plan,
            marker: PhantomData,
        }
    }

    pub(crate) fn plan(&self) -> &Rc<Plan<'s>> {
        &self.plan
    }

    /// The plan as it is executed, with overly deep sub-plans materialized.
    pub(crate) fn bounded_plan(&self) -> Result<Rc<Plan<'s>>> {
        Plan::bounded(&self.plan, self.store)
    }

    /// A set of another element kind derived from this one.
    pub(crate) fn derive<F: Element<'s>>(&self, plan: Plan<'s>) -> QuerySet<'s, F> {
        QuerySet::new(self.store, plan)
    }

    /// The same rows read as another element kind of equal width.
    pub(crate) fn cast<F: Element<'s>>(&self) -> QuerySet<'s, F> {
        QuerySet::shared(self.store, Rc::clone(&self.plan))
    }

    pub(crate) fn filter(&self, condition: Condition<'s>) -> Self {
        self.derive(Plan::Filter {
            input: Rc::clone(&self.plan),
            condition,
        })
    }

    pub(crate) fn project<F: Element<'s>>(&self, columns: Vec<Column>) -> QuerySet<'s, F> {
        self.derive(Plan::Project {
            input: Rc::clone(&self.plan),
            columns,
        })
    }

    pub(crate) fn check_same<F>(&self, other: &QuerySet<'s, F>) -> Result<()> {
        self.store.check_owner(other.store)
    }

    pub fn owner(&self) -> &'s QuadStore {
        self.store
    }

    pub fn size(&self) -> Result<usize> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query
            .push("select count(*) from (")
            .push_plan(&plan)
            .push(")");
        let count: i64 = query.scalar(self.store)?;
        usize::try_from(count)
            .map_err(|_| QuadError::corrupted(format!("negative row count {count}")))
    }

    pub fn has_any(&self) -> Result<bool> {
        let mut query = Query::new();
        let plan = self.bounded_plan()?;
        query.push("select exists (").push_plan(&plan).push(")");
        query.scalar(self.store)
    }

    fn compound(&self, operator: SetOperator, other: &Self) -> Result<Self> {
        self.check_same(other)?;
        if self.plan.width() != other.plan.width() {
            return Err(QuadError::invalid("sets of different width cannot be combined"));
        }
        Ok(self.derive(Plan::Compound {
            operator,
            left: Rc::clone(&self.plan),
            right: Rc::clone(&other.plan),
        }))
    }

    pub fn union(&self, other: &Self) -> Result<Self> {
        self.compound(SetOperator::Union, other)
    }

    pub fn except(&self, other: &Self) -> Result<Self> {
        self.compound(SetOperator::Except, other)
    }

    pub fn intersect(&self, other: &Self) -> Result<Self> {
        self.compound(SetOperator::Intersect, other)
    }

    /// The same elements sorted ascending by all columns.
    pub fn order(&self) -> Self {
        if self.plan.is_ordered() {
            return self.clone();
        }
        self.derive(Plan::Order(Rc::clone(&self.plan)))
    }

    /// Freezes the current content into an ephemeral table.
    pub fn copy(&self) -> Result<Self> {
        if self.plan.temp().is_some() {
            return Ok(self.clone());
        }
        let table = self.store.materialize(&*self.bounded_plan()?)?;
        E::prepare_table(&table)?;
        Ok(self.derive(Plan::Scan(Source::Temp(table))))
    }

    /// Keeps the elements accepted by the predicate, evaluated in process.
    pub fn having<F>(&self, mut accept: F) -> Result<Self>
    where
        F: FnMut(&E) -> bool,
    {
        let kinds = self.plan.kinds();
        let accepted = self.iter().filter(|item| item.as_ref().map_or(true, &mut accept));
        let table = self.store.collect_items(&kinds, accepted)?;
        E::prepare_table(&table)?;
        Ok(self.derive(Plan::Scan(Source::Temp(table))))
    }

    pub fn iter(&self) -> Cursor<'s, E> {
        Cursor {
            store: self.store,
            plan: Rc::clone(&self.plan),
            bounded: false,
            width: self.plan.width(),
            page: Vec::new().into_iter(),
            last: None,
            done: false,
            marker: PhantomData,
        }
    }

    /// All elements in ascending column order.
    pub fn to_list(&self) -> Result<Vec<E>> {
        self.iter().collect()
    }

    pub fn to_set(&self) -> Result<HashSet<E>>
    where
        E: Eq + Hash,
    {
        self.iter().collect()
    }
}

impl<'s, E: Element<'s>> IntoIterator for &QuerySet<'s, E> {
    type Item = Result<E>;
    type IntoIter = Cursor<'s, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ------------- Cursor -------------
/// Single pass over a set. Rows are fetched in pages ordered by all columns;
/// every page resumes after the last row of the previous one, so no statement
/// stays open between calls to `next`.
pub struct Cursor<'s, E> {
    store: &'s QuadStore,
    plan: Rc<Plan<'s>>,
    bounded: bool,
    width: usize,
    page: std::vec::IntoIter<Vec<SqlValue>>,
    last: Option<Vec<SqlValue>>,
    done: bool,
    marker: PhantomData<fn() -> E>,
}

impl<'s, E: Element<'s>> Cursor<'s, E> {
    fn fetch(&mut self) -> Result<Vec<Vec<SqlValue>>> {
        if !self.bounded {
            self.plan = Plan::bounded(&self.plan, self.store)?;
            self.bounded = true;
        }
        let mut query = Query::new();
        query.push("select * from (").push_plan(&self.plan).push(") as A");
        if let Some(last) = &self.last {
            query.push(" where (").push_columns(Some("A"), self.width).push(") > (");
            for (index, value) in last.iter().enumerate() {
                if index > 0 {
                    query.push(", ");
                }
                query.push_param(value.clone());
            }
            query.push(")");
        }
        query
            .push(" order by ")
            .push_columns(Some("A"), self.width)
            .push(" limit ")
            .push_int(self.store.config().fetch_size as i64);
        let width = self.width;
        query.rows(self.store, |row| {
            (0..width).map(|index| row.get::<_, SqlValue>(index)).collect()
        })
    }
}

impl<'s, E: Element<'s>> Iterator for Cursor<'s, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.page.next() {
                return Some(E::decode(self.store, &row));
            }
            if self.done {
                return None;
            }
            match self.fetch() {
                Ok(rows) => {
                    if rows.len() < self.store.config().fetch_size {
                        self.done = true;
                    }
                    if rows.is_empty() {
                        return None;
                    }
                    self.last = rows.last().cloned();
                    self.page = rows.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
