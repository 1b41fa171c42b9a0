// Entities of the quad store: nodes, edges (quads), value assignments and tuples.
//
// Every entity is a small value object that borrows the store it belongs to.
// Identity is defined by the keys it carries together with the owning store,
// so two independently created handles for the same logical entity are equal.
// Creating an entity never touches the database, only put/pop/state do.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rusqlite::types::Value as SqlValue;

use crate::error::{QuadError, Result};
use crate::persist::QuadStore;

// ------------- Key -------------
pub type Key = i64;

pub(crate) fn key_at(row: &[SqlValue], index: usize) -> Result<Key> {
    match row.get(index) {
        Some(SqlValue::Integer(key)) => Ok(*key),
        other => Err(QuadError::corrupted(format!(
            "expected a node key in column {index}, found {other:?}"
        ))),
    }
}

pub(crate) fn text_at(row: &[SqlValue], index: usize) -> Result<String> {
    match row.get(index) {
        Some(SqlValue::Text(text)) => Ok(text.clone()),
        other => Err(QuadError::corrupted(format!(
            "expected a text value in column {index}, found {other:?}"
        ))),
    }
}

// ------------- Node -------------
#[derive(Clone, Copy)]
pub struct Node<'s> {
    store: &'s QuadStore,
    key: Key,
}

impl<'s> Node<'s> {
    pub(crate) fn new(store: &'s QuadStore, key: Key) -> Self {
        Self { store, key }
    }
    pub fn owner(&self) -> &'s QuadStore {
        self.store
    }
    pub fn key(&self) -> Key {
        self.key
    }
    /// The interned text of this node, if it carries one.
    pub fn value(&self) -> Result<Option<String>> {
        self.store.node_value(self.key)
    }
    /// Removes the value of this node and every edge referencing it in any role.
    pub fn pop(&self) -> Result<bool> {
        self.store.pop_node(self.key)
    }
    /// A node is stored when it has a value or appears in a stored edge.
    pub fn state(&self) -> Result<bool> {
        self.store.node_state(self.key)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.store.same(other.store)
    }
}
impl Eq for Node<'_> {}
impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node({})", self.key)
    }
}
impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

// ------------- Role -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Role {
    Context,
    Predicate,
    Subject,
    Object,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Context, Role::Predicate, Role::Subject, Role::Object];

    /// Position of the role within an edge row.
    pub fn column(self) -> usize {
        match self {
            Role::Context => 0,
            Role::Predicate => 1,
            Role::Subject => 2,
            Role::Object => 3,
        }
    }
    /// The letter used when describing index orders, e.g. "CPSO".
    pub fn letter(self) -> char {
        match self {
            Role::Context => 'C',
            Role::Predicate => 'P',
            Role::Subject => 'S',
            Role::Object => 'O',
        }
    }
    pub fn from_letter(letter: char) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.letter() == letter)
    }
}

// ------------- Edge -------------
#[derive(Clone, Copy)]
pub struct Edge<'s> {
    store: &'s QuadStore,
    keys: [Key; 4],
}

impl<'s> Edge<'s> {
    pub(crate) fn new(store: &'s QuadStore, keys: [Key; 4]) -> Self {
        Self { store, keys }
    }
    pub fn owner(&self) -> &'s QuadStore {
        self.store
    }
    pub fn keys(&self) -> [Key; 4] {
        self.keys
    }
    pub fn node(&self, role: Role) -> Node<'s> {
        Node::new(self.store, self.keys[role.column()])
    }
    pub fn context(&self) -> Node<'s> {
        self.node(Role::Context)
    }
    pub fn predicate(&self) -> Node<'s> {
        self.node(Role::Predicate)
    }
    pub fn subject(&self) -> Node<'s> {
        self.node(Role::Subject)
    }
    pub fn object(&self) -> Node<'s> {
        self.node(Role::Object)
    }
    /// Inserts this edge; returns false when it was already stored.
    pub fn put(&self) -> Result<bool> {
        self.store.put_edge(self.keys)
    }
    pub fn pop(&self) -> Result<bool> {
        self.store.pop_edge(self.keys)
    }
    pub fn state(&self) -> Result<bool> {
        self.store.edge_state(self.keys)
    }
}

impl PartialEq for Edge<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.store.same(other.store)
    }
}
impl Eq for Edge<'_> {}
impl Hash for Edge<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys.hash(state);
    }
}
impl fmt::Debug for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Edge{:?}", self.keys)
    }
}
impl fmt::Display for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [c, p, s, o] = self.keys;
        write!(f, "({c}, {p}, {s}, {o})")
    }
}

// ------------- Value -------------
/// A node paired with its text. Values are a projection of the node table,
/// not a separately stored kind of entity.
#[derive(Clone)]
pub struct Value<'s> {
    store: &'s QuadStore,
    key: Key,
    string: String,
}

impl<'s> Value<'s> {
    pub(crate) fn new(store: &'s QuadStore, key: Key, string: String) -> Self {
        Self { store, key, string }
    }
    pub fn owner(&self) -> &'s QuadStore {
        self.store
    }
    pub fn node(&self) -> Node<'s> {
        Node::new(self.store, self.key)
    }
    pub fn string(&self) -> &str {
        &self.string
    }
    /// Removes this value from its node, leaving edges untouched.
    pub fn pop(&self) -> Result<bool> {
        self.store.pop_value(self.key, &self.string)
    }
    pub fn state(&self) -> Result<bool> {
        self.store.value_state(self.key, &self.string)
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.string == other.string && self.store.same(other.store)
    }
}
impl Eq for Value<'_> {}
impl Hash for Value<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.string.hash(state);
    }
}
impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Value({}, {:?})", self.key, self.string)
    }
}
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = \"{}\"", self.key, self.string)
    }
}

// ------------- Tuple -------------
#[derive(Clone)]
pub struct Tuple<'s> {
    store: &'s QuadStore,
    keys: Vec<Key>,
}

impl<'s> Tuple<'s> {
    pub(crate) fn new(store: &'s QuadStore, keys: Vec<Key>) -> Self {
        Self { store, keys }
    }
    pub fn owner(&self) -> &'s QuadStore {
        self.store
    }
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    pub fn get(&self, role: usize) -> Option<Node<'s>> {
        self.keys.get(role).map(|key| Node::new(self.store, *key))
    }
    pub fn nodes(&self) -> Vec<Node<'s>> {
        self.keys.iter().map(|key| Node::new(self.store, *key)).collect()
    }
}

impl PartialEq for Tuple<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.store.same(other.store)
    }
}
impl Eq for Tuple<'_> {}
impl Hash for Tuple<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys.hash(state);
    }
}
impl fmt::Debug for Tuple<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tuple{:?}", self.keys)
    }
}

// ------------- Names -------------
/// Role names of a tuple set. Non-empty, without duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Names {
    list: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl Names {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(QuadError::invalid("a tuple needs at least one role name"));
        }
        let mut list = Vec::with_capacity(names.len());
        let mut lookup = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if name.is_empty() {
                return Err(QuadError::invalid("role names must not be empty"));
            }
            if lookup.insert(name.to_owned(), index).is_some() {
                return Err(QuadError::invalid(format!("duplicate role name '{name}'")));
            }
            list.push(name.to_owned());
        }
        Ok(Self { list, lookup })
    }
    pub fn len(&self) -> usize {
        self.list.len()
    }
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
    pub fn as_slice(&self) -> &[String] {
        &self.list
    }
    pub fn role(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }
    pub fn name(&self, role: usize) -> Result<&str> {
        self.list
            .get(role)
            .map(String::as_str)
            .ok_or_else(|| QuadError::invalid(format!("no role at position {role}")))
    }
}

/// Something that identifies a column of a tuple set: a position or a name.
pub trait RoleRef {
    fn resolve(&self, names: &Names) -> Result<usize>;
}

impl RoleRef for usize {
    fn resolve(&self, names: &Names) -> Result<usize> {
        names.name(*self).map(|_| *self)
    }
}

impl RoleRef for &str {
    fn resolve(&self, names: &Names) -> Result<usize> {
        names
            .role(self)
            .ok_or_else(|| QuadError::invalid(format!("unknown role name '{self}'")))
    }
}

impl RoleRef for String {
    fn resolve(&self, names: &Names) -> Result<usize> {
        self.as_str().resolve(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_positions() {
        let names = Names::new(&["who", "knows", "whom"]).unwrap();
        assert_eq!(names.role("knows"), Some(1));
        assert_eq!(names.role("nobody"), None);
        assert_eq!(names.name(2).unwrap(), "whom");
        assert!(names.name(3).is_err());
        assert_eq!("whom".resolve(&names).unwrap(), 2);
        assert_eq!(0usize.resolve(&names).unwrap(), 0);
    }

    #[test]
    fn names_reject_duplicates_and_empties() {
        assert!(Names::new(&["a", "a"]).is_err());
        assert!(Names::new::<&str>(&[]).is_err());
        assert!(Names::new(&["a", ""]).is_err());
    }

    #[test]
    fn roles_round_trip_letters() {
        for role in Role::ALL {
            assert_eq!(Role::from_letter(role.letter()), Some(role));
        }
        assert_eq!(Role::from_letter('X'), None);
    }
}
