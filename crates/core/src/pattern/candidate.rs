//! Match results and their lowering to operand bindings.

use std::collections::BTreeMap;
use std::fmt;

use crate::codec::Bindings;
use crate::common::{Error, Result};
use crate::expr::NodeId;
use crate::isa::operand::{OperandDesc, OperandKind};
use crate::isa::registry::{DefId, Registry};

/// Value bound to one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// A source subtree whose value must live in a register.
    Value(NodeId),
    /// An immediate.
    Imm(i64),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(id) => write!(f, "{id}"),
            Self::Imm(v) => write!(f, "{v}"),
        }
    }
}

/// A definition with its operands bound, before register allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInstruction {
    /// Selected definition.
    pub def: DefId,
    /// Bound operands by name; output-only operands are absent.
    pub operands: BTreeMap<String, Bound>,
}

impl BoundInstruction {
    /// Chooses registers through `assigner` and produces codec bindings.
    ///
    /// Every register operand is passed to the assigner, outputs with `None`.
    ///
    /// # Errors
    ///
    /// Propagates assigner errors; an immediate operand bound to a value is
    /// [`Error::InvalidOperand`].
    pub fn lower(&self, registry: &Registry, assigner: &mut impl RegisterAssigner) -> Result<Bindings> {
        let def = registry.def(self.def);
        let mut bindings = Bindings::new();
        for op in &def.operands {
            let bound = self.operands.get(&op.name).copied();
            let value = match (op.kind, bound) {
                (OperandKind::Register, bound) => i64::from(assigner.assign(op, bound)?),
                (OperandKind::Immediate, Some(Bound::Imm(v))) => v,
                (OperandKind::Immediate, other) => {
                    return Err(Error::InvalidOperand {
                        text: other.map_or_else(|| "<none>".to_owned(), |b| b.to_string()),
                        reason: format!("`{}` needs a constant", op.name),
                    });
                }
            };
            let _ = bindings.insert(&op.name, value);
        }
        Ok(bindings)
    }
}

/// Ranking of a match; larger is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity {
    /// Source nodes in the covered subtree.
    pub covered: usize,
    /// Source nodes absorbed by the template itself.
    pub absorbed: usize,
    /// Guards that were checked and held.
    pub guards: usize,
}

/// One definition matched at one subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    /// The bound instruction.
    pub instruction: BoundInstruction,
    /// Specificity score.
    pub score: Specificity,
    /// Root of the replaced subtree.
    pub root: NodeId,
    /// Source nodes replaced by the instruction (operand subtrees excluded).
    pub absorbed: Vec<NodeId>,
    /// Constant-add nodes folded in by rounding detection.
    pub consumed: Vec<NodeId>,
}

impl MatchCandidate {
    /// Matched definition.
    pub const fn def(&self) -> DefId {
        self.instruction.def
    }

    /// Binding of one operand.
    pub fn binding(&self, operand: &str) -> Option<Bound> {
        self.instruction.operands.get(operand).copied()
    }

    /// See [`BoundInstruction::lower`].
    ///
    /// # Errors
    ///
    /// Same as [`BoundInstruction::lower`].
    pub fn lower(&self, registry: &Registry, assigner: &mut impl RegisterAssigner) -> Result<Bindings> {
        self.instruction.lower(registry, assigner)
    }
}

/// Result of [`Matcher::select`](crate::pattern::Matcher::select).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The best candidate over all subtrees.
    Matched(Box<MatchCandidate>),
    /// Nothing matched; the tree is left to default code generation.
    NoMatch,
}

impl MatchOutcome {
    /// The candidate, if any.
    pub fn candidate(&self) -> Option<&MatchCandidate> {
        match self {
            Self::Matched(c) => Some(c),
            Self::NoMatch => None,
        }
    }
}

/// Register allocation hook.
///
/// The matcher never picks registers; callers decide where each bound value
/// lives.
pub trait RegisterAssigner {
    /// Register number for `operand`, bound to `value` (`None` for outputs).
    ///
    /// # Errors
    ///
    /// Implementations report values they cannot place.
    fn assign(&mut self, operand: &OperandDesc, value: Option<Bound>) -> Result<u32>;
}

impl<F> RegisterAssigner for F
where
    F: FnMut(&OperandDesc, Option<Bound>) -> Result<u32>,
{
    fn assign(&mut self, operand: &OperandDesc, value: Option<Bound>) -> Result<u32> {
        self(operand, value)
    }
}

/// Assigns registers from a fixed operand-name map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedRegisters(pub BTreeMap<String, u32>);

impl<const N: usize> From<[(&str, u32); N]> for FixedRegisters {
    fn from(pairs: [(&str, u32); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }
}

impl RegisterAssigner for FixedRegisters {
    fn assign(&mut self, operand: &OperandDesc, _value: Option<Bound>) -> Result<u32> {
        self.0
            .get(&operand.name)
            .copied()
            .ok_or_else(|| Error::InvalidOperand {
                text: operand.name.clone(),
                reason: "no register assigned".to_owned(),
            })
    }
}
