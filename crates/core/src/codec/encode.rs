//! Instruction encoder.

use crate::codec::Bindings;
use crate::codec::word::{EncodedWord, WordSize};
use crate::common::bits::low_mask;
use crate::common::constants::REGISTER_COUNT;
use crate::common::{Error, Result};
use crate::isa::instruction::InstructionDef;
use crate::isa::operand::OperandKind;

/// Packs `bindings` into the word described by `def`.
///
/// Fixed opcode/funct bits come from the layout; every operand value is
/// range-checked against its declared width and the segments that carry it.
/// This does not consult a registry, so it cannot tell whether another
/// definition would capture the result; use
/// [`Registry::encode`](crate::Registry::encode) for that.
///
/// # Errors
///
/// - [`Error::UnknownOperand`] for a binding the definition does not declare.
/// - [`Error::MissingOperand`] for a declared operand without a binding.
/// - [`Error::EncodingOverflow`] for a value outside its operand or field range.
pub fn encode(def: &InstructionDef, bindings: &Bindings) -> Result<EncodedWord> {
    if let Some(name) = bindings.names().find(|name| def.operand(name).is_none()) {
        return Err(Error::UnknownOperand {
            instruction: def.mnemonic.clone(),
            operand: name.to_owned(),
        });
    }

    let mut word = u64::from(def.match_bits());
    for op in &def.operands {
        let value = bindings.get(&op.name).ok_or_else(|| Error::MissingOperand {
            instruction: def.mnemonic.clone(),
            operand: op.name.clone(),
        })?;
        let overflow = || Error::EncodingOverflow {
            instruction: def.mnemonic.clone(),
            operand: op.name.clone(),
            value,
        };

        let raw = match op.kind {
            OperandKind::Register => {
                let bias = i64::from(op.bias);
                if value < bias || value >= i64::from(REGISTER_COUNT) {
                    return Err(overflow());
                }
                (value - bias) as u64
            }
            OperandKind::Immediate => {
                let (lo, hi) = op.immediate_range();
                if value < lo || value > hi {
                    return Err(overflow());
                }
                (value as u64) & low_mask(op.width)
            }
        };

        let (_, covered) = def.encoding.coverage(&op.name);
        if raw & !covered != 0 {
            return Err(overflow());
        }
        for seg in def.encoding.segments(&op.name) {
            let part = (raw >> seg.offset) & low_mask(seg.len());
            word |= part.checked_shl(seg.lo).unwrap_or(0);
        }
    }

    Ok(EncodedWord::new(word as u32, WordSize::of(def.variant)))
}
