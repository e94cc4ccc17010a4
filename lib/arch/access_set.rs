use crate::ast::NodeRef;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// A deduplicated set of `(operand, node)` pairs which remembers insertion
/// order.
///
/// Two pairs are the same element when both the operand and the node handle
/// are equal. The same operand paired with a different node is a different
/// element. Iteration follows the order in which elements were first
/// inserted.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(
    from = "Vec<(K, NodeRef)>",
    into = "Vec<(K, NodeRef)>",
    bound(
        serialize = "K: Clone + Eq + Hash + Serialize",
        deserialize = "K: Clone + Eq + Hash + Deserialize<'de>"
    )
)]
pub struct AccessSet<K: Clone + Eq + Hash> {
    entries: Vec<(K, NodeRef)>,
    index: FxHashSet<(K, NodeRef)>,
}

impl<K: Clone + Eq + Hash> AccessSet<K> {
    pub fn new() -> AccessSet<K> {
        AccessSet {
            entries: Vec::new(),
            index: FxHashSet::default(),
        }
    }

    /// Insert a pair. Returns false if the pair was already present.
    pub fn insert(&mut self, operand: K, node: NodeRef) -> bool {
        let entry = (operand, node);
        if self.index.contains(&entry) {
            return false;
        }
        self.index.insert(entry.clone());
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, operand: &K, node: NodeRef) -> bool {
        self.index.contains(&(operand.clone(), node))
    }

    /// Returns true if `operand` is present, paired with any node.
    pub fn contains_operand(&self, operand: &K) -> bool {
        self.entries.iter().any(|(o, _)| o == operand)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<(K, NodeRef)> {
        self.entries.iter()
    }

    /// The operands in this set, in insertion order.
    pub fn operands(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(operand, _)| operand)
    }

    /// The nodes in this set, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.entries.iter().map(|(_, node)| *node)
    }

    /// Remove every element, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<K: Clone + Eq + Hash> Default for AccessSet<K> {
    fn default() -> AccessSet<K> {
        AccessSet::new()
    }
}

impl<K: Clone + Eq + Hash> PartialEq for AccessSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Clone + Eq + Hash> Eq for AccessSet<K> {}

impl<K: Clone + Eq + Hash> From<Vec<(K, NodeRef)>> for AccessSet<K> {
    fn from(entries: Vec<(K, NodeRef)>) -> AccessSet<K> {
        let mut set = AccessSet::new();
        for (operand, node) in entries {
            set.insert(operand, node);
        }
        set
    }
}

impl<K: Clone + Eq + Hash> From<AccessSet<K>> for Vec<(K, NodeRef)> {
    fn from(set: AccessSet<K>) -> Vec<(K, NodeRef)> {
        set.entries
    }
}

impl<'a, K: Clone + Eq + Hash> IntoIterator for &'a AccessSet<K> {
    type Item = &'a (K, NodeRef);
    type IntoIter = std::slice::Iter<'a, (K, NodeRef)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
