//! Arena expression trees.
//!
//! Nodes live in a flat `Vec` and refer to their children by [`NodeId`]. The
//! builder only hands out ids of nodes it has already pushed, so every child
//! precedes its parent and index order is a valid bottom-up order.

use std::fmt;

use crate::common::bits::fits_signed;
use crate::common::{Error, Result};
use crate::expr::types::IntType;

/// Index of a node inside its [`ExprTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    /// Whether the operator yields a boolean.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
        )
    }

    /// C spelling.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Named source operand.
    Var(String),
    /// Integer literal.
    Const(i128),
    /// Unary operation.
    Unary(UnaryOp, NodeId),
    /// Binary operation.
    Binary(BinaryOp, NodeId, NodeId),
    /// Conversion to the node's type.
    Cast(NodeId),
    /// `cond ? then : else`.
    Select(NodeId, NodeId, NodeId),
}

/// One node and the type the source computes it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprNode {
    /// Operator or leaf.
    pub kind: ExprKind,
    /// Native type.
    pub ty: IntType,
}

/// An expression tree in arena form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprTree {
    nodes: Vec<ExprNode>,
    root: NodeId,
}

impl ExprTree {
    /// Root node.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    /// Number of nodes in the arena.
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids in bottom-up order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id).kind {
            ExprKind::Var(_) | ExprKind::Const(_) => Vec::new(),
            ExprKind::Unary(_, a) | ExprKind::Cast(a) => vec![a],
            ExprKind::Binary(_, a, b) => vec![a, b],
            ExprKind::Select(c, a, b) => vec![c, a, b],
        }
    }

    /// Every node of the subtree rooted at `id`, pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Number of nodes in the subtree rooted at `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.subtree(id).len()
    }

    /// C-like rendering of the subtree rooted at `id`.
    pub fn render(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.kind {
            ExprKind::Var(name) => name.clone(),
            ExprKind::Const(v) => v.to_string(),
            ExprKind::Unary(UnaryOp::Neg, a) => format!("-{}", self.render(*a)),
            ExprKind::Unary(UnaryOp::Not, a) => format!("~{}", self.render(*a)),
            ExprKind::Binary(op, a, b) => {
                format!("({} {} {})", self.render(*a), op.symbol(), self.render(*b))
            }
            ExprKind::Cast(a) => format!("({}){}", node.ty, self.render(*a)),
            ExprKind::Select(c, a, b) => format!(
                "({} ? {} : {})",
                self.render(*c),
                self.render(*a),
                self.render(*b)
            ),
        }
    }
}

impl fmt::Display for ExprTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.root))
    }
}

/// Incremental constructor for [`ExprTree`].
///
/// Result types follow C arithmetic with unsigned-preserving promotion
/// (see [`IntType::common`]).
///
/// ```
/// use isax_core::expr::{ExprBuilder, IntType};
///
/// let mut b = ExprBuilder::new();
/// let x = b.var("x", IntType::U32);
/// let y = b.var("y", IntType::U32);
/// let sum = b.add(x, y);
/// let one = b.literal(1);
/// let avg = b.shr(sum, one);
/// let tree = b.finish(avg).unwrap();
/// assert_eq!(tree.to_string(), "((x + y) >> 1)");
/// ```
#[derive(Debug, Default)]
pub struct ExprBuilder {
    nodes: Vec<ExprNode>,
}

impl ExprBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: ExprKind, ty: IntType) -> NodeId {
        self.nodes.push(ExprNode { kind, ty });
        NodeId::from_index(self.nodes.len() - 1)
    }

    /// Type of an already built node.
    pub fn ty(&self, id: NodeId) -> IntType {
        self.nodes[id.index()].ty
    }

    /// Variable leaf.
    pub fn var(&mut self, name: &str, ty: IntType) -> NodeId {
        self.push(ExprKind::Var(name.to_owned()), ty)
    }

    /// Constant leaf with an explicit type.
    pub fn constant(&mut self, value: i128, ty: IntType) -> NodeId {
        self.push(ExprKind::Const(value), ty)
    }

    /// Constant leaf typed like an unsuffixed C literal (`int`, then `long`).
    pub fn literal(&mut self, value: i128) -> NodeId {
        let ty = if fits_signed(value, 32) {
            IntType::I32
        } else if fits_signed(value, 64) {
            IntType::I64
        } else {
            IntType::U64
        };
        self.constant(value, ty)
    }

    /// Unary operation.
    pub fn unary(&mut self, op: UnaryOp, a: NodeId) -> NodeId {
        let ty = self.ty(a).promoted();
        self.push(ExprKind::Unary(op, a), ty)
    }

    /// Binary operation.
    pub fn binary(&mut self, op: BinaryOp, a: NodeId, b: NodeId) -> NodeId {
        let ty = match op {
            BinaryOp::Shl | BinaryOp::Shr => self.ty(a).promoted(),
            op if op.is_comparison() => IntType::I32,
            _ => IntType::common(self.ty(a), self.ty(b)),
        };
        self.push(ExprKind::Binary(op, a, b), ty)
    }

    /// `-a`
    pub fn neg(&mut self, a: NodeId) -> NodeId {
        self.unary(UnaryOp::Neg, a)
    }

    /// `~a`
    pub fn not(&mut self, a: NodeId) -> NodeId {
        self.unary(UnaryOp::Not, a)
    }

    /// `a + b`
    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Add, a, b)
    }

    /// `a - b`
    pub fn sub(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Sub, a, b)
    }

    /// `a * b`
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Mul, a, b)
    }

    /// `a & b`
    pub fn and(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::And, a, b)
    }

    /// `a | b`
    pub fn or(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Or, a, b)
    }

    /// `a ^ b`
    pub fn xor(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Xor, a, b)
    }

    /// `a << b`
    pub fn shl(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Shl, a, b)
    }

    /// `a >> b`
    pub fn shr(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(BinaryOp::Shr, a, b)
    }

    /// `(ty)a`
    pub fn cast(&mut self, a: NodeId, ty: IntType) -> NodeId {
        self.push(ExprKind::Cast(a), ty)
    }

    /// `c ? a : b`
    pub fn select(&mut self, c: NodeId, a: NodeId, b: NodeId) -> NodeId {
        let ty = IntType::common(self.ty(a), self.ty(b));
        self.push(ExprKind::Select(c, a, b), ty)
    }

    /// Freezes the arena with `root` as the tree root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `root` was not produced by this builder.
    pub fn finish(self, root: NodeId) -> Result<ExprTree> {
        if root.index() >= self.nodes.len() {
            return Err(Error::parse(0, format!("root {root} is not a node of this tree")));
        }
        Ok(ExprTree {
            nodes: self.nodes,
            root,
        })
    }
}
