//! Canonical algebraic form.
//!
//! Matching compares shapes, so algebraically identical expressions must have
//! one shape. The canonicalizer rewrites an annotated tree into a second arena:
//! 1. **Sums:** `+`, `-`, and unary `-` chains become one n-ary sum of signed
//!    terms plus a folded constant. A nested sum is only merged into its parent
//!    when it did not wrap or wraps in the same type. Opposite terms cancel and
//!    the remaining sum gets its own width analysis.
//! 2. **Folding:** Constant-only subtrees become one constant.
//! 3. **Casts:** Lossless casts disappear; truncating casts become `trunc`.
//! 4. **Masks:** `x & (2^k - 1)` with `k >= width(x)` and `x` never negative keeps all reachable bits and disappears.
//! 5. **Max/Min:** `a > b ? a : b` and its mirrored forms become `max`/`min`.
//!
//! Every canonical node records the source nodes it stands for, so a match can
//! report exactly which source nodes it absorbed.

use std::collections::HashMap;

use crate::common::bits::{full_mask_width, low_mask, value_width};
use crate::expr::tree::{BinaryOp, ExprKind, NodeId, UnaryOp};
use crate::expr::types::IntType;
use crate::expr::width::{self, AnnotatedTree, WidthInfo};

/// Index into a [`CanonTree`].
pub(crate) type CanonId = usize;

/// Non-sum operators of the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OpKind {
    Mul,
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    Trunc(u32),
    Max,
    Min,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Select,
}

impl OpKind {
    pub(crate) const fn from_binary(op: BinaryOp) -> Option<Self> {
        let kind = match op {
            BinaryOp::Mul => Self::Mul,
            BinaryOp::And => Self::And,
            BinaryOp::Or => Self::Or,
            BinaryOp::Xor => Self::Xor,
            BinaryOp::Shl => Self::Shl,
            BinaryOp::Shr => Self::Shr,
            BinaryOp::Lt => Self::Lt,
            BinaryOp::Le => Self::Le,
            BinaryOp::Gt => Self::Gt,
            BinaryOp::Ge => Self::Ge,
            BinaryOp::Eq => Self::Eq,
            BinaryOp::Ne => Self::Ne,
            BinaryOp::Add | BinaryOp::Sub => return None,
        };
        Some(kind)
    }

    pub(crate) const fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Mul | Self::And | Self::Or | Self::Xor | Self::Max | Self::Min | Self::Eq | Self::Ne
        )
    }
}

/// One signed term of a sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Term {
    pub negated: bool,
    pub node: CanonId,
}

/// Flattened `+`/`-` chain.
#[derive(Debug, Clone, Default)]
pub(crate) struct Sum {
    pub terms: Vec<Term>,
    pub constant: i128,
    /// `+`/`-` source nodes with a constant operand.
    pub const_adds: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub(crate) enum CanonKind {
    Var(String),
    Const(i128),
    Op(OpKind, Vec<CanonId>),
    Sum(Sum),
}

#[derive(Debug, Clone)]
pub(crate) struct CanonNode {
    pub kind: CanonKind,
    /// Source node whose analysis describes this value.
    pub defining: NodeId,
    /// Outermost source node this canonical node stands for.
    pub source: NodeId,
    /// Source nodes folded into this node itself (children excluded).
    pub absorbed: Vec<NodeId>,
    /// Built by rounding detection; has no source value of its own.
    pub synthetic: bool,
    /// Analysis of a sum whose cancelled terms `defining` still counts.
    pub info: Option<WidthInfo>,
}

/// Canonical arena over an annotated tree.
#[derive(Debug, Clone)]
pub(crate) struct CanonTree<'a> {
    tree: &'a AnnotatedTree,
    nodes: Vec<CanonNode>,
    root: CanonId,
}

impl<'a> CanonTree<'a> {
    /// Canonicalizes the whole tree.
    pub(crate) fn build(tree: &'a AnnotatedTree) -> Self {
        Self::build_at(tree, tree.root())
    }

    /// Canonicalizes the subtree rooted at `id`.
    pub(crate) fn build_at(tree: &'a AnnotatedTree, id: NodeId) -> Self {
        let mut builder = Builder {
            tree,
            nodes: Vec::new(),
        };
        let root = builder.build(id);
        Self {
            tree,
            nodes: builder.nodes,
            root,
        }
    }

    pub(crate) const fn root(&self) -> CanonId {
        self.root
    }

    pub(crate) const fn source_tree(&self) -> &'a AnnotatedTree {
        self.tree
    }

    pub(crate) fn node(&self, id: CanonId) -> &CanonNode {
        &self.nodes[id]
    }

    pub(crate) fn info(&self, id: CanonId) -> WidthInfo {
        let node = &self.nodes[id];
        node.info.unwrap_or_else(|| self.tree.info(node.defining))
    }

    pub(crate) fn ty(&self, id: CanonId) -> IntType {
        self.tree.tree().node(self.nodes[id].defining).ty
    }

    pub(crate) fn constant(&self, id: CanonId) -> Option<i128> {
        match self.nodes[id].kind {
            CanonKind::Const(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn children(&self, id: CanonId) -> Vec<CanonId> {
        match &self.nodes[id].kind {
            CanonKind::Var(_) | CanonKind::Const(_) => Vec::new(),
            CanonKind::Op(_, args) => args.clone(),
            CanonKind::Sum(sum) => sum.terms.iter().map(|t| t.node).collect(),
        }
    }

    /// Nodes reachable from the root, pre-order.
    pub(crate) fn reachable(&self) -> Vec<CanonId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Maps outermost source nodes to the canonical nodes standing for them.
    pub(crate) fn by_source(&self) -> HashMap<NodeId, CanonId> {
        self.reachable()
            .into_iter()
            .filter(|&id| !self.nodes[id].synthetic)
            .map(|id| (self.nodes[id].source, id))
            .collect()
    }

    /// Structural key; equal keys mean equal canonical values.
    pub(crate) fn key(&self, id: CanonId) -> String {
        key_of(&self.nodes, id)
    }

    pub(crate) fn same(&self, a: CanonId, b: CanonId) -> bool {
        a == b || self.key(a) == self.key(b)
    }

    /// Adds a node that exists only for one match attempt.
    pub(crate) fn push_synthetic(&mut self, kind: CanonKind, like: CanonId) -> CanonId {
        let template = &self.nodes[like];
        let node = CanonNode {
            kind,
            defining: template.defining,
            source: template.source,
            absorbed: template.absorbed.clone(),
            synthetic: true,
            info: template.info,
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}

fn key_of(nodes: &[CanonNode], id: CanonId) -> String {
    match &nodes[id].kind {
        CanonKind::Var(name) => format!("v:{name}"),
        // '~' sorts after every letter: constants go last.
        CanonKind::Const(v) => format!("~{v}"),
        CanonKind::Op(op, args) => {
            let inner: Vec<String> = args.iter().map(|&a| key_of(nodes, a)).collect();
            format!("({op:?} {})", inner.join(" "))
        }
        CanonKind::Sum(sum) => {
            let inner: Vec<String> = sum
                .terms
                .iter()
                .map(|t| format!("{}{}", if t.negated { '-' } else { '+' }, key_of(nodes, t.node)))
                .collect();
            format!("(sum {} ~{})", inner.join(" "), sum.constant)
        }
    }
}

/// Reduces `value` modulo the width of `ty`, reinterpreting as `ty`.
fn wrap(value: i128, ty: IntType) -> i128 {
    if ty.bits >= 128 {
        return value;
    }
    let masked = value & low_mask(ty.bits.min(64)) as i128;
    if ty.signed && ty.bits <= 64 && masked >> (ty.bits - 1) & 1 == 1 {
        masked - (1i128 << ty.bits)
    } else {
        masked
    }
}

fn fold(op: OpKind, a: i128, b: i128) -> Option<i128> {
    let value = match op {
        OpKind::Mul => a.checked_mul(b)?,
        OpKind::And => a & b,
        OpKind::Or => a | b,
        OpKind::Xor => a ^ b,
        OpKind::Shl => a.checked_shl(u32::try_from(b).ok().filter(|&k| k < 127)?)?,
        OpKind::Shr => a >> u32::try_from(b).ok()?.min(127),
        OpKind::Lt => i128::from(a < b),
        OpKind::Le => i128::from(a <= b),
        OpKind::Gt => i128::from(a > b),
        OpKind::Ge => i128::from(a >= b),
        OpKind::Eq => i128::from(a == b),
        OpKind::Ne => i128::from(a != b),
        OpKind::Max => a.max(b),
        OpKind::Min => a.min(b),
        OpKind::Not | OpKind::Trunc(_) | OpKind::Select => return None,
    };
    Some(value)
}

struct Builder<'a> {
    tree: &'a AnnotatedTree,
    nodes: Vec<CanonNode>,
}

impl Builder<'_> {
    fn push(&mut self, kind: CanonKind, id: NodeId, absorbed: Vec<NodeId>) -> CanonId {
        self.nodes.push(CanonNode {
            kind,
            defining: id,
            source: id,
            absorbed,
            synthetic: false,
            info: None,
        });
        self.nodes.len() - 1
    }

    /// Lets `outer` collapse into an existing canonical node.
    fn wrap_into(&mut self, c: CanonId, outer: NodeId, extra: Vec<NodeId>) -> CanonId {
        let node = &mut self.nodes[c];
        node.source = outer;
        node.absorbed.push(outer);
        node.absorbed.extend(extra);
        c
    }

    fn constant(&self, c: CanonId) -> Option<i128> {
        match self.nodes[c].kind {
            CanonKind::Const(v) => Some(v),
            _ => None,
        }
    }

    fn info_of(&self, c: CanonId) -> WidthInfo {
        let node = &self.nodes[c];
        node.info.unwrap_or_else(|| self.tree.info(node.defining))
    }

    /// Every source node represented by `c` and its descendants.
    fn all_absorbed(&self, c: CanonId) -> Vec<NodeId> {
        let mut out = self.nodes[c].absorbed.clone();
        let children: Vec<CanonId> = match &self.nodes[c].kind {
            CanonKind::Var(_) | CanonKind::Const(_) => Vec::new(),
            CanonKind::Op(_, args) => args.clone(),
            CanonKind::Sum(sum) => sum.terms.iter().map(|t| t.node).collect(),
        };
        for child in children {
            out.extend(self.all_absorbed(child));
        }
        out
    }

    fn ty(&self, id: NodeId) -> IntType {
        self.tree.tree().node(id).ty
    }

    fn build(&mut self, id: NodeId) -> CanonId {
        let node = self.tree.tree().node(id);
        let info = self.tree.info(id);
        match &node.kind {
            ExprKind::Var(name) => self.push(CanonKind::Var(name.clone()), id, vec![id]),
            ExprKind::Const(v) => self.push(CanonKind::Const(*v), id, vec![id]),
            ExprKind::Cast(a) => {
                let c = self.build(*a);
                if !info.overflow {
                    return self.wrap_into(c, id, Vec::new());
                }
                if let Some(v) = self.constant(c) {
                    let absorbed = self.nodes[c].absorbed.clone();
                    let folded = self.push(CanonKind::Const(wrap(v, node.ty)), id, absorbed);
                    return self.wrap_into(folded, id, Vec::new());
                }
                self.push(CanonKind::Op(OpKind::Trunc(node.ty.bits), vec![c]), id, vec![id])
            }
            ExprKind::Unary(UnaryOp::Not, a) => {
                let c = self.build(*a);
                if let Some(v) = self.constant(c) {
                    let mut absorbed = self.nodes[c].absorbed.clone();
                    absorbed.push(id);
                    return self.push(CanonKind::Const(wrap(!v, node.ty)), id, absorbed);
                }
                self.push(CanonKind::Op(OpKind::Not, vec![c]), id, vec![id])
            }
            ExprKind::Unary(UnaryOp::Neg, _)
            | ExprKind::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) => self.build_sum(id),
            ExprKind::Binary(op, a, b) => {
                let (op, a, b) = (*op, *a, *b);
                let kind = OpKind::from_binary(op).unwrap_or(OpKind::Select);
                let ca = self.build(a);
                let cb = self.build(b);
                self.build_op(id, kind, ca, cb)
            }
            ExprKind::Select(c, a, b) => {
                let (c, a, b) = (*c, *a, *b);
                let cc = self.build(c);
                let ca = self.build(a);
                let cb = self.build(b);
                self.build_select(id, cc, ca, cb)
            }
        }
    }

    fn build_op(&mut self, id: NodeId, kind: OpKind, ca: CanonId, cb: CanonId) -> CanonId {
        let ty = self.ty(id);
        if let (Some(va), Some(vb)) = (self.constant(ca), self.constant(cb))
            && let Some(v) = fold(kind, va, vb)
        {
            let mut absorbed = vec![id];
            absorbed.extend(self.nodes[ca].absorbed.iter().copied());
            absorbed.extend(self.nodes[cb].absorbed.iter().copied());
            return self.push(CanonKind::Const(wrap(v, ty)), id, absorbed);
        }

        if kind == OpKind::And {
            for (value, mask) in [(ca, cb), (cb, ca)] {
                let Some(k) = self.constant(mask).and_then(full_mask_width) else {
                    continue;
                };
                let info = self.info_of(value);
                // A value that may be negative has bits above its width set.
                if k >= info.width && !info.signed && self.constant(value).is_none() {
                    let extra = self.nodes[mask].absorbed.clone();
                    return self.wrap_into(value, id, extra);
                }
            }
        }

        let mut args = vec![ca, cb];
        if kind.is_commutative() {
            args.sort_by_cached_key(|&c| key_of(&self.nodes, c));
        }
        self.push(CanonKind::Op(kind, args), id, vec![id])
    }

    fn build_select(&mut self, id: NodeId, cc: CanonId, ca: CanonId, cb: CanonId) -> CanonId {
        if let CanonKind::Op(cmp, args) = &self.nodes[cc].kind
            && let [x, y] = args.as_slice()
        {
            let (x, y, cmp) = (*x, *y, *cmp);
            let same = |p: CanonId, q: CanonId| key_of(&self.nodes, p) == key_of(&self.nodes, q);
            let direct = same(x, ca) && same(y, cb);
            let mirrored = same(x, cb) && same(y, ca);
            let kind = match cmp {
                OpKind::Gt | OpKind::Ge if direct => Some(OpKind::Max),
                OpKind::Gt | OpKind::Ge if mirrored => Some(OpKind::Min),
                OpKind::Lt | OpKind::Le if direct => Some(OpKind::Min),
                OpKind::Lt | OpKind::Le if mirrored => Some(OpKind::Max),
                _ => None,
            };
            if let Some(kind) = kind {
                let mut absorbed = vec![id];
                absorbed.extend(self.all_absorbed(cc));
                let mut args = vec![ca, cb];
                args.sort_by_cached_key(|&c| key_of(&self.nodes, c));
                return self.push(CanonKind::Op(kind, args), id, absorbed);
            }
        }
        self.push(CanonKind::Op(OpKind::Select, vec![cc, ca, cb]), id, vec![id])
    }

    fn build_sum(&mut self, id: NodeId) -> CanonId {
        let root_ty = self.ty(id);
        let mut sum = Sum::default();
        let mut absorbed = Vec::new();
        let _ = self.collect(id, false, root_ty, true, &mut sum, &mut absorbed);
        if self.tree.info(id).overflow {
            sum.constant = wrap(sum.constant, root_ty);
        }

        sum.terms.sort_by_cached_key(|t| (key_of(&self.nodes, t.node), t.negated));
        let cancelled = self.cancel_opposites(&mut sum.terms, &mut absorbed);

        if sum.terms.is_empty() {
            return self.push(CanonKind::Const(wrap(sum.constant, root_ty)), id, absorbed);
        }
        if sum.constant == 0 && sum.terms.len() == 1 && !sum.terms[0].negated {
            let term = sum.terms[0].node;
            absorbed.retain(|&n| n != id);
            return self.wrap_into(term, id, absorbed);
        }
        let info = cancelled.then(|| self.sum_info(&sum, root_ty));
        let c = self.push(CanonKind::Sum(sum), id, absorbed);
        self.nodes[c].info = info;
        c
    }

    /// Removes `t` and `-t` pairs; their source nodes become absorbed.
    /// Returns whether anything cancelled.
    fn cancel_opposites(&self, terms: &mut Vec<Term>, absorbed: &mut Vec<NodeId>) -> bool {
        let before = terms.len();
        let mut kept: Vec<(String, Term)> = Vec::with_capacity(terms.len());
        for term in terms.drain(..) {
            let key = key_of(&self.nodes, term.node);
            let partner = kept
                .iter()
                .position(|(k, t)| t.negated != term.negated && *k == key);
            if let Some(pos) = partner {
                let (_, other) = kept.remove(pos);
                absorbed.extend(self.all_absorbed(other.node));
                absorbed.extend(self.all_absorbed(term.node));
            } else {
                kept.push((key, term));
            }
        }
        terms.extend(kept.into_iter().map(|(_, t)| t));
        terms.len() != before
    }

    /// Width analysis of the remaining terms added up in `ty`, in term order.
    fn sum_info(&self, sum: &Sum, ty: IntType) -> WidthInfo {
        let zero = width::settle(ty, 1, false);
        let constant = (sum.constant != 0).then(|| {
            let (w, signed) = value_width(sum.constant);
            width::settle(ty, w, signed)
        });
        sum.terms
            .iter()
            .map(|t| (t.negated, self.info_of(t.node)))
            .chain(constant.map(|c| (false, c)))
            .fold(None, |acc, (negated, info)| {
                let op = if negated { BinaryOp::Sub } else { BinaryOp::Add };
                Some(match acc {
                    None if !negated => info,
                    None => width::binary(ty, op, zero, info, None),
                    Some(acc) => width::binary(ty, op, acc, info, None),
                })
            })
            .unwrap_or(zero)
    }

    /// Walks one `+`/`-` chain. Returns whether `id` folded to a constant.
    fn collect(
        &mut self,
        id: NodeId,
        negated: bool,
        root_ty: IntType,
        is_root: bool,
        sum: &mut Sum,
        absorbed: &mut Vec<NodeId>,
    ) -> bool {
        let node = self.tree.tree().node(id);
        let info = self.tree.info(id);
        let mergeable = is_root || !info.overflow || node.ty == root_ty;
        match node.kind {
            ExprKind::Binary(op @ (BinaryOp::Add | BinaryOp::Sub), a, b) if mergeable => {
                absorbed.push(id);
                let a_const = self.collect(a, negated, root_ty, false, sum, absorbed);
                let b_negated = if op == BinaryOp::Sub { !negated } else { negated };
                let b_const = self.collect(b, b_negated, root_ty, false, sum, absorbed);
                if a_const || b_const {
                    sum.const_adds.push(id);
                }
                false
            }
            ExprKind::Unary(UnaryOp::Neg, a) if mergeable => {
                absorbed.push(id);
                self.collect(a, !negated, root_ty, false, sum, absorbed)
            }
            ExprKind::Cast(a) if !info.overflow && self.is_additive(a) => {
                absorbed.push(id);
                self.collect(a, negated, root_ty, false, sum, absorbed)
            }
            _ => {
                let c = self.build(id);
                if let Some(v) = self.constant(c) {
                    let v = if negated { v.wrapping_neg() } else { v };
                    sum.constant = sum.constant.wrapping_add(v);
                    absorbed.extend(self.nodes[c].absorbed.iter().copied());
                    true
                } else {
                    sum.terms.push(Term { negated, node: c });
                    false
                }
            }
        }
    }

    fn is_additive(&self, id: NodeId) -> bool {
        matches!(
            self.tree.tree().node(id).kind,
            ExprKind::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) | ExprKind::Unary(UnaryOp::Neg, _)
        )
    }
}
