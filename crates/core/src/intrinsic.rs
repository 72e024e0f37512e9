//! Intrinsic binding.
//!
//! An intrinsic call names a definition directly by alias, bypassing pattern
//! matching. Arguments bind positionally to the definition's operands in
//! declared order, skipping output-only operands, and the result flows through
//! the same lowering and encoding path as a matched instruction.

use std::collections::BTreeMap;

use tracing::debug;

use crate::codec::EncodedWord;
use crate::common::{Error, Result};
use crate::expr::canon::CanonTree;
use crate::expr::{AnnotatedTree, NodeId};
use crate::isa::instruction::IntrinsicSignature;
use crate::isa::operand::OperandKind;
use crate::isa::registry::Registry;
use crate::pattern::{Bound, BoundInstruction, RegisterAssigner};

/// Binds intrinsic calls against a registry.
#[derive(Debug, Clone, Copy)]
pub struct IntrinsicBinder<'r> {
    registry: &'r Registry,
}

impl<'r> IntrinsicBinder<'r> {
    /// Creates a binder.
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// C signature of `alias`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownIntrinsic`].
    pub fn signature(&self, alias: &str) -> Result<IntrinsicSignature> {
        let id = self
            .registry
            .by_intrinsic(alias)
            .ok_or_else(|| Error::UnknownIntrinsic(alias.to_owned()))?;
        Ok(self.registry.def(id).signature(alias))
    }

    /// Binds already-classified arguments.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownIntrinsic`] if no definition declares `alias`.
    /// - [`Error::InvalidIntrinsicCall`] for a wrong argument count, or an
    ///   immediate argument that is not a constant or does not fit.
    pub fn bind(&self, alias: &str, args: &[Bound]) -> Result<BoundInstruction> {
        let id = self
            .registry
            .by_intrinsic(alias)
            .ok_or_else(|| Error::UnknownIntrinsic(alias.to_owned()))?;
        let def = self.registry.def(id);
        let invalid = |reason: String| Error::InvalidIntrinsicCall {
            alias: alias.to_owned(),
            reason,
        };

        let inputs: Vec<_> = def.intrinsic_inputs().map(|(_, op)| op).collect();
        if inputs.len() != args.len() {
            return Err(invalid(format!(
                "expected {} argument(s), got {}; signature is `{}`",
                inputs.len(),
                args.len(),
                def.signature(alias)
            )));
        }

        let mut operands = BTreeMap::new();
        for (n, (op, arg)) in inputs.into_iter().zip(args).enumerate() {
            if op.kind == OperandKind::Immediate {
                let Bound::Imm(value) = *arg else {
                    return Err(invalid(format!(
                        "argument {} (`{}`) must be a constant",
                        n + 1,
                        op.name
                    )));
                };
                let (lo, hi) = op.immediate_range();
                if value < lo || value > hi {
                    return Err(invalid(format!(
                        "argument {} (`{}`) = {value} is outside {lo}..={hi}",
                        n + 1,
                        op.name
                    )));
                }
            }
            let _ = operands.insert(op.name.clone(), *arg);
        }

        debug!(alias, instruction = %self.registry.name(id), "intrinsic bound");
        Ok(BoundInstruction { def: id, operands })
    }

    /// Binds call arguments given as subtrees of `tree`.
    ///
    /// Arguments that fold to a constant bind as immediates.
    ///
    /// # Errors
    ///
    /// As [`IntrinsicBinder::bind`].
    pub fn bind_call(&self, tree: &AnnotatedTree, alias: &str, args: &[NodeId]) -> Result<BoundInstruction> {
        let bound: Vec<Bound> = args
            .iter()
            .map(|&id| {
                let canon = CanonTree::build_at(tree, id);
                canon
                    .constant(canon.root())
                    .and_then(|v| i64::try_from(v).ok())
                    .map_or(Bound::Value(id), Bound::Imm)
            })
            .collect();
        self.bind(alias, &bound)
    }

    /// Binds, lowers, and encodes a call.
    ///
    /// # Errors
    ///
    /// As [`IntrinsicBinder::bind`], then [`Registry::emit`].
    pub fn emit(&self, alias: &str, args: &[Bound], assigner: &mut impl RegisterAssigner) -> Result<EncodedWord> {
        let instruction = self.bind(alias, args)?;
        self.registry.emit(&instruction, assigner)
    }
}
