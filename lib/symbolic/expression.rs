use crate::arch::RegisterId;
use crate::ast::{AstContext, NodeRef};
use crate::Error;
use crate::RC;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared pointer to a `SymbolicExpression` owned by the symbolic engine.
pub type SymbolicExpressionRef = RC<SymbolicExpression>;

/// What a symbolic expression assigns to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ExpressionKind {
    /// The expression is the new value of a register.
    Register(RegisterId),
    /// The expression is the new value at a memory address.
    Memory(u64),
    /// The expression models an effect which is not stored anywhere, such as
    /// a branch condition.
    Volatile,
}

/// A symbolic expression, pairing an expression graph node with a taint flag.
///
/// The taint flag can be changed through a shared reference. The taint engine
/// usually resolves taint for an expression after it has been attached to an
/// instruction.
#[derive(Debug, Deserialize, Serialize)]
pub struct SymbolicExpression {
    id: usize,
    node: NodeRef,
    kind: ExpressionKind,
    tainted: AtomicBool,
    comment: Option<String>,
}

impl SymbolicExpression {
    /// Create a new, untainted, `SymbolicExpression`.
    pub fn new(id: usize, node: NodeRef, kind: ExpressionKind) -> SymbolicExpression {
        SymbolicExpression {
            id,
            node,
            kind,
            tainted: AtomicBool::new(false),
            comment: None,
        }
    }

    /// Wrap this expression in a `SymbolicExpressionRef`.
    pub fn into_ref(self) -> SymbolicExpressionRef {
        RC::new(self)
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> SymbolicExpression {
        self.comment = Some(comment.into());
        self
    }

    /// The identifier the symbolic engine gave this expression.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The root node of this expression.
    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted.load(Ordering::Relaxed)
    }

    pub fn set_tainted(&self, tainted: bool) {
        self.tainted.store(tainted, Ordering::Relaxed);
    }

    /// Returns true if the node of this expression contains a symbolic
    /// variable.
    ///
    /// `ast` must be the context which owns this expression's node.
    pub fn is_symbolized<A: AstContext + ?Sized>(&self, ast: &A) -> Result<bool, Error> {
        ast.is_symbolized(self.node)
    }
}

impl fmt::Display for SymbolicExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ref!{} = {}", self.id, self.node)?;
        if let Some(ref comment) = self.comment {
            write!(f, " ; {}", comment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::tests::TestNode;
    use crate::ast::Arena;

    #[test]
    fn taint_is_shared_through_references() {
        let mut arena = Arena::new();
        let node = arena.insert(TestNode::concrete(64)).unwrap();

        let expression = SymbolicExpression::new(0, node, ExpressionKind::Volatile).into_ref();
        let alias = expression.clone();
        assert!(!alias.is_tainted());

        expression.set_tainted(true);
        assert!(alias.is_tainted());
    }

    #[test]
    fn symbolized_and_tainted_are_independent() {
        let mut arena = Arena::new();
        let symbolic = arena.insert(TestNode::symbolic(64)).unwrap();
        let concrete = arena.insert(TestNode::concrete(64)).unwrap();

        let a = SymbolicExpression::new(0, symbolic, ExpressionKind::Register(RegisterId::Rax));
        let b = SymbolicExpression::new(1, concrete, ExpressionKind::Memory(0x1000));
        b.set_tainted(true);

        assert!(a.is_symbolized(&arena).unwrap());
        assert!(!a.is_tainted());
        assert!(!b.is_symbolized(&arena).unwrap());
        assert!(b.is_tainted());
    }

    #[test]
    fn display() {
        let mut arena = Arena::new();
        let node = arena.insert(TestNode::concrete(1)).unwrap();
        let expression =
            SymbolicExpression::new(7, node, ExpressionKind::Volatile).with_comment("zf");
        assert_eq!(
            format!("{}", expression),
            format!("ref!7 = #{}:0 ; zf", arena.id().value())
        );
    }
}
