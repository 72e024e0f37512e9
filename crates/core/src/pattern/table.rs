//! Operator dispatch table.
//!
//! Every canonical operator shape maps to exactly one matching rule, and the
//! registry indexes template roots by the same key so the matcher only tries
//! definitions whose root could possibly align.

use std::collections::HashMap;

use crate::expr::canon::OpKind;
use crate::isa::registry::DefId;

/// How the arguments of a shape are aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    /// Arguments align positionally.
    Ordered,
    /// Both argument orders are tried.
    Commutative,
    /// Signed terms align as a multiset, with backtracking.
    Sum,
}

/// Operator of a canonical or template node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Shape {
    Op(OpKind),
    Sum,
}

/// `(operator, arity)` table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ShapeKey {
    pub shape: Shape,
    pub arity: usize,
}

impl ShapeKey {
    pub(crate) const fn new(shape: Shape, arity: usize) -> Self {
        Self { shape, arity }
    }
}

/// Matching rule of a shape; `None` for shapes no template can have.
pub(crate) const fn rule(key: ShapeKey) -> Option<Rule> {
    match (key.shape, key.arity) {
        (Shape::Sum, n) if n >= 1 => Some(Rule::Sum),
        (Shape::Op(OpKind::Not | OpKind::Trunc(_)), 1)
        | (
            Shape::Op(
                OpKind::Shl | OpKind::Shr | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge,
            ),
            2,
        )
        | (Shape::Op(OpKind::Select), 3) => Some(Rule::Ordered),
        (
            Shape::Op(
                OpKind::Mul
                | OpKind::And
                | OpKind::Or
                | OpKind::Xor
                | OpKind::Max
                | OpKind::Min
                | OpKind::Eq
                | OpKind::Ne,
            ),
            2,
        ) => Some(Rule::Commutative),
        _ => None,
    }
}

/// Definitions indexed by the shape of their template root.
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchTable {
    by_shape: HashMap<ShapeKey, Vec<DefId>>,
}

impl MatchTable {
    pub(crate) fn insert(&mut self, key: ShapeKey, def: DefId) {
        self.by_shape.entry(key).or_default().push(def);
    }

    /// Definitions whose template root has this shape, in load order.
    pub(crate) fn candidates(&self, key: ShapeKey) -> &[DefId] {
        self.by_shape.get(&key).map_or(&[], Vec::as_slice)
    }
}
