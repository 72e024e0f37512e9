//! Width/range analysis.
//!
//! A single bottom-up pass over the arena computes, for every node, the minimal
//! number of bits that represents every value the subtree can produce, given the
//! widths of its leaves. It provides:
//! 1. **Exact width:** The mathematical result width before native truncation.
//! 2. **Reachable width:** What survives the node's native type (`min(exact, native)`).
//! 3. **Overflow flag:** Whether the exact result does not fit the native type.
//!
//! The overflow flag is the signal the matcher uses to tell a native-width
//! opcode from its carry-preserving counterpart. Everything is integer
//! arithmetic on widths; no value ranges are approximated.

use crate::common::bits::value_width;
use crate::expr::tree::{BinaryOp, ExprKind, ExprTree, NodeId, UnaryOp};
use crate::expr::types::IntType;

/// Per-node analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthInfo {
    /// Reachable width after native truncation.
    pub width: u32,
    /// Width of the exact mathematical result.
    pub exact: u32,
    /// Whether the reachable value may be negative.
    pub signed: bool,
    /// The exact result does not fit the node's native type.
    pub overflow: bool,
    /// A cast whose type already holds every value of its operand.
    pub sufficient: bool,
}

/// An expression tree with a [`WidthInfo`] for every node.
#[derive(Debug, Clone)]
pub struct AnnotatedTree {
    tree: ExprTree,
    info: Vec<WidthInfo>,
}

impl AnnotatedTree {
    /// The underlying tree.
    pub const fn tree(&self) -> &ExprTree {
        &self.tree
    }

    /// Analysis result of one node.
    pub fn info(&self, id: NodeId) -> WidthInfo {
        self.info[id.index()]
    }

    /// Root of the tree.
    pub const fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Gives the tree back.
    pub fn into_tree(self) -> ExprTree {
        self.tree
    }
}

/// Stateless analyzer; see the module docs for the rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct WidthAnalyzer;

impl WidthAnalyzer {
    /// Annotates every node of `tree`.
    pub fn analyze(tree: ExprTree) -> AnnotatedTree {
        let mut info: Vec<WidthInfo> = Vec::with_capacity(tree.len());
        for id in tree.ids() {
            let node = tree.node(id);
            let get = |child: NodeId| info[child.index()];
            let computed = match &node.kind {
                ExprKind::Var(_) => WidthInfo {
                    width: node.ty.bits,
                    exact: node.ty.bits,
                    signed: node.ty.signed,
                    overflow: false,
                    sufficient: false,
                },
                ExprKind::Const(value) => {
                    let (w, signed) = value_width(*value);
                    settle(node.ty, w, signed)
                }
                ExprKind::Unary(UnaryOp::Neg, a) => {
                    let a = get(*a);
                    settle(node.ty, a.width + 1, true)
                }
                ExprKind::Unary(UnaryOp::Not, _) => WidthInfo {
                    width: node.ty.bits,
                    exact: node.ty.bits,
                    signed: node.ty.signed,
                    overflow: false,
                    sufficient: false,
                },
                ExprKind::Binary(op, a, b) => {
                    let shift = constant(&tree, *b);
                    binary(node.ty, *op, get(*a), get(*b), shift)
                }
                ExprKind::Cast(a) => cast(node.ty, get(*a)),
                ExprKind::Select(_, a, b) => {
                    let (w, signed) = unify(get(*a), get(*b));
                    settle(node.ty, w, signed)
                }
            };
            info.push(computed);
        }
        AnnotatedTree { tree, info }
    }
}

fn constant(tree: &ExprTree, id: NodeId) -> Option<i128> {
    match tree.node(id).kind {
        ExprKind::Const(v) => Some(v),
        _ => None,
    }
}

/// Common representation of two operands: an unsigned side mixed with a
/// signed one needs one more bit to become two's complement.
const fn unify(a: WidthInfo, b: WidthInfo) -> (u32, bool) {
    let wa = if b.signed && !a.signed { a.width + 1 } else { a.width };
    let wb = if a.signed && !b.signed { b.width + 1 } else { b.width };
    (if wa > wb { wa } else { wb }, a.signed || b.signed)
}

/// Truncates an exact result to the native type.
pub(crate) const fn settle(ty: IntType, exact: u32, signed: bool) -> WidthInfo {
    let exact = if exact == 0 { 1 } else { exact };
    if ty.holds(exact, signed) {
        WidthInfo {
            width: exact,
            exact,
            signed,
            overflow: false,
            sufficient: false,
        }
    } else {
        WidthInfo {
            width: ty.bits,
            exact,
            signed: ty.signed,
            overflow: true,
            sufficient: false,
        }
    }
}

pub(crate) fn binary(ty: IntType, op: BinaryOp, a: WidthInfo, b: WidthInfo, shift: Option<i128>) -> WidthInfo {
    match op {
        BinaryOp::Add => {
            let (w, signed) = unify(a, b);
            settle(ty, w + 1, signed)
        }
        BinaryOp::Sub => {
            let (w, _) = unify(a, b);
            settle(ty, w + 1, true)
        }
        BinaryOp::Mul => {
            if a.signed || b.signed {
                let wa = if a.signed { a.width } else { a.width + 1 };
                let wb = if b.signed { b.width } else { b.width + 1 };
                settle(ty, wa + wb, true)
            } else {
                settle(ty, a.width + b.width, false)
            }
        }
        BinaryOp::And => match (a.signed, b.signed) {
            (false, false) => settle(ty, a.width.min(b.width), false),
            (false, true) => settle(ty, a.width, false),
            (true, false) => settle(ty, b.width, false),
            (true, true) => settle(ty, a.width.max(b.width), true),
        },
        BinaryOp::Or | BinaryOp::Xor => {
            let (w, signed) = unify(a, b);
            settle(ty, w, signed)
        }
        BinaryOp::Shl => match shift {
            Some(k) if (0..128).contains(&k) => settle(ty, a.width.saturating_add(k as u32), a.signed),
            _ => WidthInfo {
                width: ty.bits,
                exact: ty.bits,
                signed: ty.signed,
                overflow: true,
                sufficient: false,
            },
        },
        BinaryOp::Shr => match shift {
            Some(k) if k >= 0 => {
                let k = u32::try_from(k).unwrap_or(u32::MAX);
                settle(ty, a.width.saturating_sub(k).max(1), a.signed)
            }
            _ => settle(ty, a.width, a.signed),
        },
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            settle(ty, 1, false)
        }
    }
}

fn cast(ty: IntType, a: WidthInfo) -> WidthInfo {
    if ty.holds(a.width, a.signed) {
        WidthInfo {
            width: a.width,
            exact: a.width,
            signed: a.signed,
            overflow: false,
            sufficient: true,
        }
    } else {
        WidthInfo {
            width: ty.bits,
            exact: a.width,
            signed: ty.signed,
            overflow: true,
            sufficient: false,
        }
    }
}
