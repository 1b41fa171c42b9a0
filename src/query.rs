//! Query plans and their rendering to SQL.
//!
//! Every set of the algebra is described by a [`Plan`], a small tree of
//! relational operators. Nothing is executed while plans are composed; a plan
//! is rendered into a single statement by a [`Query`] only when a terminal
//! operation (size, iteration, put/pop, copy) runs. Rendering splices the
//! text of nested plans in place. Plans nested deeper than the store's
//! `max_plan_depth` are first cut into steps by [`Plan::bounded`], which
//! materializes the deep parts into ephemeral tables.
//!
//! Every rendered plan produces the columns `C0 .. Cn` in order. Edges use
//! `C0..C3` for context, predicate, subject and object, node sets use `C0`,
//! value sets use `C0` for the node key and `C1` for the text.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Row, params_from_iter};
use tracing::debug;

use crate::construct::Key;
use crate::error::Result;
use crate::persist::{QuadStore, TempTable};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ColumnKind {
    Key,
    Text,
}

impl ColumnKind {
    pub(crate) fn declaration(self) -> &'static str {
        match self {
            ColumnKind::Key => "integer not null",
            ColumnKind::Text => "text not null",
        }
    }
}

pub(crate) const EDGE_KINDS: [ColumnKind; 4] = [ColumnKind::Key; 4];
pub(crate) const NODE_KINDS: [ColumnKind; 1] = [ColumnKind::Key];
pub(crate) const VALUE_KINDS: [ColumnKind; 2] = [ColumnKind::Key, ColumnKind::Text];
pub(crate) const STRING_KINDS: [ColumnKind; 1] = [ColumnKind::Text];

// ------------- Plan -------------
pub(crate) enum Source<'s> {
    /// Keys of all nodes carrying a value.
    Nodes,
    /// Key and text of all nodes carrying a value.
    Values,
    /// All stored edges.
    Edges,
    /// A materialized ephemeral table.
    Temp(Rc<TempTable<'s>>),
}

const NODE_COLUMNS: &[&str] = &["Node_Key"];
const VALUE_COLUMNS: &[&str] = &["Node_Key", "Value"];
const EDGE_COLUMNS: &[&str] = &["Context", "Predicate", "Subject", "Object"];

impl Source<'_> {
    /// Names of the stored columns, or `None` for ephemeral tables whose
    /// columns are already called `C0 .. Cn`.
    fn columns(&self) -> Option<&'static [&'static str]> {
        match self {
            Source::Nodes => Some(NODE_COLUMNS),
            Source::Values => Some(VALUE_COLUMNS),
            Source::Edges => Some(EDGE_COLUMNS),
            Source::Temp(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Literal {
    Key(Key),
    Text(String),
}

pub(crate) enum Condition<'s> {
    /// Any of the columns equals the literal.
    Equals { columns: Vec<usize>, literal: Literal },
    /// Any of the columns is contained in the single column set.
    Within { columns: Vec<usize>, set: Rc<Plan<'s>> },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Column {
    Input(usize),
    Constant(Key),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Side {
    Left(usize),
    Right(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetOperator {
    Union,
    Except,
    Intersect,
}

impl SetOperator {
    fn keyword(self) -> &'static str {
        match self {
            SetOperator::Union => " union ",
            SetOperator::Except => " except ",
            SetOperator::Intersect => " intersect ",
        }
    }
}

pub(crate) enum Plan<'s> {
    Scan(Source<'s>),
    Filter {
        input: Rc<Plan<'s>>,
        condition: Condition<'s>,
    },
    /// Distinct projection; constants replace a column by a fixed node.
    Project {
        input: Rc<Plan<'s>>,
        columns: Vec<Column>,
    },
    /// Distinct join; an empty `on` list is a cross product.
    Join {
        left: Rc<Plan<'s>>,
        right: Rc<Plan<'s>>,
        on: Vec<(usize, usize)>,
        columns: Vec<Side>,
    },
    Compound {
        operator: SetOperator,
        left: Rc<Plan<'s>>,
        right: Rc<Plan<'s>>,
    },
    Order(Rc<Plan<'s>>),
}

impl<'s> Plan<'s> {
    pub(crate) fn kinds(&self) -> Vec<ColumnKind> {
        match self {
            Plan::Scan(Source::Nodes) => NODE_KINDS.to_vec(),
            Plan::Scan(Source::Values) => VALUE_KINDS.to_vec(),
            Plan::Scan(Source::Edges) => EDGE_KINDS.to_vec(),
            Plan::Scan(Source::Temp(table)) => table.kinds().to_vec(),
            Plan::Filter { input, .. } | Plan::Order(input) => input.kinds(),
            Plan::Project { input, columns } => {
                let kinds = input.kinds();
                columns
                    .iter()
                    .map(|column| match column {
                        Column::Input(index) => kinds[*index],
                        Column::Constant(_) => ColumnKind::Key,
                    })
                    .collect()
            }
            Plan::Join { left, right, columns, .. } => {
                let (left, right) = (left.kinds(), right.kinds());
                columns
                    .iter()
                    .map(|side| match side {
                        Side::Left(index) => left[*index],
                        Side::Right(index) => right[*index],
                    })
                    .collect()
            }
            Plan::Compound { left, .. } => left.kinds(),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.kinds().len()
    }

    /// The ephemeral table backing this plan, if it is a plain scan of one.
    pub(crate) fn temp(&self) -> Option<&Rc<TempTable<'s>>> {
        match self {
            Plan::Scan(Source::Temp(table)) => Some(table),
            _ => None,
        }
    }

    pub(crate) fn is_ordered(&self) -> bool {
        matches!(self, Plan::Order(_))
    }

    /// Rewrites the plan so that no chain of nested operators is deeper than
    /// the store's `max_plan_depth`. Deeper sub-plans are materialized into
    /// ephemeral tables bottom-up, which the rewritten plan keeps alive.
    pub(crate) fn bounded(plan: &Rc<Plan<'s>>, store: &'s QuadStore) -> Result<Rc<Plan<'s>>> {
        let mut done = HashMap::new();
        let (plan, _) = Self::bound(plan, store, store.config().max_plan_depth, &mut done)?;
        Ok(plan)
    }

    // shared sub-plans are rewritten once
    fn bound(
        plan: &Rc<Plan<'s>>,
        store: &'s QuadStore,
        limit: usize,
        done: &mut HashMap<*const Plan<'s>, (Rc<Plan<'s>>, usize)>,
    ) -> Result<(Rc<Plan<'s>>, usize)> {
        if let Some((rewritten, depth)) = done.get(&Rc::as_ptr(plan)) {
            return Ok((Rc::clone(rewritten), *depth));
        }
        let (rewritten, depth) = match &**plan {
            Plan::Scan(_) => return Ok((Rc::clone(plan), 1)),
            Plan::Filter { input, condition } => {
                let (input, mut depth) = Self::bound(input, store, limit, done)?;
                let condition = match condition {
                    Condition::Equals { columns, literal } => Condition::Equals {
                        columns: columns.clone(),
                        literal: literal.clone(),
                    },
                    Condition::Within { columns, set } => {
                        let (set, inner) = Self::bound(set, store, limit, done)?;
                        depth = depth.max(inner);
                        Condition::Within { columns: columns.clone(), set }
                    }
                };
                (Plan::Filter { input, condition }, depth + 1)
            }
            Plan::Project { input, columns } => {
                let (input, depth) = Self::bound(input, store, limit, done)?;
                (Plan::Project { input, columns: columns.clone() }, depth + 1)
            }
            Plan::Join { left, right, on, columns } => {
                let (left, left_depth) = Self::bound(left, store, limit, done)?;
                let (right, right_depth) = Self::bound(right, store, limit, done)?;
                let join = Plan::Join {
                    left,
                    right,
                    on: on.clone(),
                    columns: columns.clone(),
                };
                (join, left_depth.max(right_depth) + 1)
            }
            Plan::Compound { operator, left, right } => {
                let (left, left_depth) = Self::bound(left, store, limit, done)?;
                let (right, right_depth) = Self::bound(right, store, limit, done)?;
                let compound = Plan::Compound { operator: *operator, left, right };
                (compound, left_depth.max(right_depth) + 1)
            }
            Plan::Order(input) => {
                let (input, depth) = Self::bound(input, store, limit, done)?;
                (Plan::Order(input), depth + 1)
            }
        };
        let result = if depth > limit {
            let table = store.materialize(&rewritten)?;
            debug!(table = %table.name(), depth, "Materialized deep plan");
            (Rc::new(Plan::Scan(Source::Temp(table))), 1)
        } else {
            (Rc::new(rewritten), depth)
        };
        done.insert(Rc::as_ptr(plan), (Rc::clone(&result.0), result.1));
        Ok(result)
    }
}

// ------------- Query -------------
/// Accumulates the text and the bound parameters of one statement.
#[derive(Default, Debug)]
pub(crate) struct Query {
    sql: String,
    params: Vec<SqlValue>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    pub(crate) fn push_int(&mut self, number: i64) -> &mut Self {
        let _ = write!(self.sql, "{number}");
        self
    }

    pub(crate) fn push_param(&mut self, value: SqlValue) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    pub(crate) fn push_literal(&mut self, literal: &Literal) -> &mut Self {
        match literal {
            Literal::Key(key) => self.push_int(*key),
            Literal::Text(text) => self.push_param(SqlValue::Text(text.clone())),
        }
    }

    /// Appends `C0, C1, ..` for the given width, optionally qualified.
    pub(crate) fn push_columns(&mut self, qualifier: Option<&str>, width: usize) -> &mut Self {
        for index in 0..width {
            if index > 0 {
                self.sql.push_str(", ");
            }
            if let Some(qualifier) = qualifier {
                self.sql.push_str(qualifier);
                self.sql.push('.');
            }
            let _ = write!(self.sql, "C{index}");
        }
        self
    }

    /// Appends column `index` of the filtered input `A`, using the stored
    /// column name when the input is a plain scan.
    fn push_input_column(&mut self, source: Option<&Source<'_>>, index: usize) -> &mut Self {
        self.push("A.");
        match source.map(Source::columns) {
            Some(Some(names)) => self.push(names[index]),
            _ => self.push("C").push_int(index as i64),
        }
    }

    fn push_condition(
        &mut self,
        source: Option<&Source<'_>>,
        condition: &Condition<'_>,
    ) -> &mut Self {
        match condition {
            Condition::Equals { columns, literal } => {
                for (position, column) in columns.iter().enumerate() {
                    if position > 0 {
                        self.push(" or ");
                    }
                    self.push_input_column(source, *column).push(" = ").push_literal(literal);
                }
                self
            }
            Condition::Within { columns, set } => {
                self.push("exists (select 1 from (")
                    .push_plan(set)
                    .push(") as B where B.C0 in (");
                for (position, column) in columns.iter().enumerate() {
                    if position > 0 {
                        self.push(", ");
                    }
                    self.push_input_column(source, *column);
                }
                self.push("))")
            }
        }
    }

    /// Appends the statement rendering the given plan.
    pub(crate) fn push_plan(&mut self, plan: &Plan<'_>) -> &mut Self {
        match plan {
            Plan::Scan(Source::Nodes) => self.push("select Node_Key as C0 from Node"),
            Plan::Scan(Source::Values) => {
                self.push("select Node_Key as C0, Value as C1 from Node")
            }
            Plan::Scan(Source::Edges) => self.push(
                "select Context as C0, Predicate as C1, Subject as C2, Object as C3 from Edge",
            ),
            Plan::Scan(Source::Temp(table)) => self
                .push("select ")
                .push_columns(None, table.kinds().len())
                .push(" from ")
                .push(table.name()),
            Plan::Filter { .. } => {
                // stacked filters share one where clause
                let mut conditions = Vec::new();
                let mut base = plan;
                while let Plan::Filter { input, condition } = base {
                    conditions.push(condition);
                    base = &**input;
                }
                conditions.reverse();
                let source = match base {
                    Plan::Scan(source) => {
                        self.push_plan(base).push(" as A where ");
                        Some(source)
                    }
                    _ => {
                        self.push("select * from (").push_plan(base).push(") as A where ");
                        None
                    }
                };
                let grouped = conditions.len() > 1;
                for (position, condition) in conditions.into_iter().enumerate() {
                    if position > 0 {
                        self.push(" and ");
                    }
                    if grouped {
                        self.push("(");
                    }
                    self.push_condition(source, condition);
                    if grouped {
                        self.push(")");
                    }
                }
                self
            }
            Plan::Project { input, columns } => {
                self.push("select distinct ");
                for (position, column) in columns.iter().enumerate() {
                    if position > 0 {
                        self.push(", ");
                    }
                    match column {
                        Column::Input(index) => self.push("C").push_int(*index as i64),
                        Column::Constant(key) => self.push_int(*key),
                    };
                    self.push(" as C").push_int(position as i64);
                }
                self.push(" from (").push_plan(input).push(")")
            }
            Plan::Join { left, right, on, columns } => {
                self.push("select distinct ");
                for (position, side) in columns.iter().enumerate() {
                    if position > 0 {
                        self.push(", ");
                    }
                    match side {
                        Side::Left(index) => self.push("A.C").push_int(*index as i64),
                        Side::Right(index) => self.push("B.C").push_int(*index as i64),
                    };
                    self.push(" as C").push_int(position as i64);
                }
                self.push(" from (").push_plan(left).push(") as A");
                if on.is_empty() {
                    self.push(" cross join (").push_plan(right).push(") as B")
                } else {
                    self.push(" join (").push_plan(right).push(") as B on ");
                    for (position, (l, r)) in on.iter().enumerate() {
                        if position > 0 {
                            self.push(" and ");
                        }
                        self.push("A.C").push_int(*l as i64).push(" = B.C").push_int(*r as i64);
                    }
                    self
                }
            }
            Plan::Compound { operator, left, right } => self
                .push("select * from (")
                .push_plan(left)
                .push(")")
                .push(operator.keyword())
                .push("select * from (")
                .push_plan(right)
                .push(")"),
            Plan::Order(input) => self
                .push("select * from (")
                .push_plan(input)
                .push(") order by ")
                .push_columns(None, input.width()),
        }
    }

    /// Executes the statement and reports whether any row changed.
    pub(crate) fn update(&self, store: &QuadStore) -> Result<bool> {
        debug!(sql = %self.sql, "update");
        let mut statement = store.connection().prepare(&self.sql)?;
        let changed = statement.execute(params_from_iter(self.params.iter()))?;
        Ok(changed != 0)
    }

    pub(crate) fn rows<T, F>(&self, store: &QuadStore, mut read: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        debug!(sql = %self.sql, "query");
        let mut statement = store.connection().prepare(&self.sql)?;
        let mut rows = statement.query(params_from_iter(self.params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(read(row)?);
        }
        Ok(result)
    }

    pub(crate) fn scalar<T: rusqlite::types::FromSql>(&self, store: &QuadStore) -> Result<T> {
        debug!(sql = %self.sql, "scalar");
        let mut statement = store.connection().prepare(&self.sql)?;
        Ok(statement.query_row(params_from_iter(self.params.iter()), |row| row.get(0))?)
    }
}
