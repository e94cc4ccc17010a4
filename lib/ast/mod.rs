//! Handles into an expression graph owned by the expression builder.
//!
//! Talon never allocates, copies or frees expression nodes. The expression
//! builder allocates nodes in a session-scoped arena and hands out `NodeRef`
//! values, which are small `Copy` handles. An `Instruction` stores handles
//! only.
//!
//! # Lifetime
//!
//! A `NodeRef` is only meaningful for the arena which created it, and only for
//! as long as that arena is alive. Holding a handle after the arena is gone is
//! allowed, but dereferencing it is a precondition violation. Every query which
//! dereferences a handle goes through an `AstContext`, and an `AstContext`
//! which does not recognise a handle reports `Error::InvalidNode` instead of
//! answering.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one expression graph arena.
///
/// Arena ids are unique for the lifetime of the process, so an arena created
/// after another one was dropped will not accept the handles of its
/// predecessor.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ArenaId(u32);

impl ArenaId {
    /// Allocate a new, never before used, arena id.
    pub fn fresh() -> ArenaId {
        ArenaId(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// A non-owning handle to a node in an expression graph.
///
/// Equality, hashing and ordering are over the handle itself, never over the
/// contents of the node it refers to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NodeRef {
    arena: ArenaId,
    index: u32,
}

impl NodeRef {
    /// Create a handle. Only arenas should need to call this.
    pub fn new(arena: ArenaId, index: u32) -> NodeRef {
        NodeRef { arena, index }
    }

    /// The arena this handle was allocated by.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The position of the node within its arena.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}:{}", self.arena.0, self.index)
    }
}

/// What Talon needs to know about an expression graph node.
pub trait AstNode {
    /// The bit-width of the value this node computes.
    fn bits(&self) -> usize;

    /// Returns true if this node, or any node it depends on, is a free
    /// symbolic variable.
    fn is_symbolized(&self) -> bool;
}

/// Read access to the arena which owns a set of nodes.
pub trait AstContext {
    /// Returns `None` if `node` was not allocated by this context.
    fn node_bits(&self, node: NodeRef) -> Option<usize>;

    /// Returns `None` if `node` was not allocated by this context.
    fn node_is_symbolized(&self, node: NodeRef) -> Option<bool>;

    /// Like `node_is_symbolized`, but an unknown handle is an error.
    fn is_symbolized(&self, node: NodeRef) -> Result<bool, Error> {
        self.node_is_symbolized(node).ok_or(Error::InvalidNode(node))
    }

    /// Like `node_bits`, but an unknown handle is an error.
    fn bits(&self, node: NodeRef) -> Result<usize, Error> {
        self.node_bits(node).ok_or(Error::InvalidNode(node))
    }
}

fn node_index(len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::Custom(format!("Arena is full at {} nodes", len)))
}

/// A simple append-only arena of expression nodes.
///
/// Nodes are never removed individually. The whole graph goes away when the
/// arena is dropped, at which point every `NodeRef` it handed out is dangling.
#[derive(Debug)]
pub struct Arena<N: AstNode> {
    id: ArenaId,
    nodes: Vec<N>,
}

impl<N: AstNode> Arena<N> {
    pub fn new() -> Arena<N> {
        Arena {
            id: ArenaId::fresh(),
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Move a node into the arena and return its handle.
    ///
    /// An arena holds at most `u32::MAX + 1` nodes. Inserting past that fails
    /// with `Error::Custom`, and the node is dropped.
    pub fn insert(&mut self, node: N) -> Result<NodeRef, Error> {
        let index = node_index(self.nodes.len())?;
        self.nodes.push(node);
        Ok(NodeRef::new(self.id, index))
    }

    /// Get the node for a handle, if the handle belongs to this arena.
    pub fn get(&self, node: NodeRef) -> Option<&N> {
        if node.arena() != self.id {
            return None;
        }
        self.nodes.get(node.index() as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N: AstNode> Default for Arena<N> {
    fn default() -> Arena<N> {
        Arena::new()
    }
}

impl<N: AstNode> AstContext for Arena<N> {
    fn node_bits(&self, node: NodeRef) -> Option<usize> {
        self.get(node).map(|n| n.bits())
    }

    fn node_is_symbolized(&self, node: NodeRef) -> Option<bool> {
        self.get(node).map(|n| n.is_symbolized())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A node which only carries the answers Talon asks for.
    #[derive(Clone, Debug)]
    pub(crate) struct TestNode {
        pub bits: usize,
        pub symbolized: bool,
    }

    impl TestNode {
        pub fn concrete(bits: usize) -> TestNode {
            TestNode {
                bits,
                symbolized: false,
            }
        }

        pub fn symbolic(bits: usize) -> TestNode {
            TestNode {
                bits,
                symbolized: true,
            }
        }
    }

    impl AstNode for TestNode {
        fn bits(&self) -> usize {
            self.bits
        }

        fn is_symbolized(&self) -> bool {
            self.symbolized
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn node_index_bounds() {
        assert_eq!(node_index(0).unwrap(), 0);
        assert_eq!(node_index(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(node_index(u32::MAX as usize + 1), Err(Error::Custom(_))));
    }

    #[test]
    fn arena_answers_for_its_handles() {
        let mut arena = Arena::new();
        let a = arena.insert(TestNode::concrete(32)).unwrap();
        let b = arena.insert(TestNode::symbolic(8)).unwrap();

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.bits(a).unwrap(), 32);
        assert!(!arena.is_symbolized(a).unwrap());
        assert!(arena.is_symbolized(b).unwrap());
    }

    #[test]
    fn arena_rejects_foreign_handles() {
        let mut first: Arena<TestNode> = Arena::new();
        let node = first.insert(TestNode::concrete(64)).unwrap();
        drop(first);

        // Index 0 exists in the new arena, but the handle is not its own.
        let mut second = Arena::new();
        second.insert(TestNode::symbolic(64)).unwrap();

        assert!(second.node_is_symbolized(node).is_none());
        match second.is_symbolized(node) {
            Err(Error::InvalidNode(n)) => assert_eq!(n, node),
            _ => panic!("expected InvalidNode"),
        }
    }

    #[test]
    fn handles_compare_by_identity() {
        let mut arena = Arena::new();
        let a = arena.insert(TestNode::concrete(8)).unwrap();
        let b = arena.insert(TestNode::concrete(8)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, NodeRef::new(arena.id(), 0));
        assert!(a < b);
    }
}
