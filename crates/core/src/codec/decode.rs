//! Instruction decoder.
//!
//! Decoding walks the registry's precomputed decode order (fewest free bits
//! first) and returns the first definition whose fixed bits match, so a
//! narrower sub-space always wins over the opcode class that contains it.

use tracing::debug;

use crate::codec::Bindings;
use crate::codec::word::EncodedWord;
use crate::common::bits::{low_mask, sign_extend};
use crate::common::{Error, Result};
use crate::isa::instruction::InstructionDef;
use crate::isa::operand::OperandKind;
use crate::isa::registry::{DefId, Registry};

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Matching definition.
    pub def: DefId,
    /// Operand values (register numbers or immediates).
    pub bindings: Bindings,
}

/// Decodes one word.
///
/// # Errors
///
/// Returns [`Error::DecodeNoMatch`] if no definition of the word's size matches.
pub fn decode(word: EncodedWord, registry: &Registry) -> Result<Decoded> {
    let Some(def) = registry.lookup_word(word) else {
        debug!(%word, "no definition matches");
        return Err(Error::DecodeNoMatch(word));
    };
    Ok(Decoded {
        def,
        bindings: extract(registry.def(def), word.bits()),
    })
}

/// Decodes the instruction at the start of `bytes`; returns it with its length.
///
/// # Errors
///
/// Returns [`Error::Truncated`] or [`Error::DecodeNoMatch`].
pub fn decode_bytes(bytes: &[u8], registry: &Registry) -> Result<(Decoded, usize)> {
    let word = EncodedWord::from_le_bytes(bytes)?;
    let decoded = decode(word, registry)?;
    Ok((decoded, word.size().bytes()))
}

/// Reads every operand of `def` out of `bits`.
pub(crate) fn extract(def: &InstructionDef, bits: u32) -> Bindings {
    def.operands
        .iter()
        .map(|op| {
            let raw = def.encoding.segments(&op.name).fold(0u64, |acc, seg| {
                let part = (u64::from(bits) >> seg.lo) & low_mask(seg.len());
                acc | (part << seg.offset)
            });
            let value = match op.kind {
                OperandKind::Register => raw as i64 + i64::from(op.bias),
                OperandKind::Immediate if op.signed => sign_extend(raw, op.width),
                OperandKind::Immediate => raw as i64,
            };
            (op.name.clone(), value)
        })
        .collect()
}
