//! Instruction definitions.
//!
//! An [`InstructionDef`] is the single source of truth for one custom
//! instruction: its operands, its bit layout, its optional semantic template,
//! and its variant flags. Definitions are deserialized from extension spec JSON
//! and become immutable once the registry has validated them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::constants::{INSTRUCTION_SIZE_16, INSTRUCTION_SIZE_32};
use crate::expr::IntType;
use crate::isa::encoding::EncodingLayout;
use crate::isa::operand::{OperandDesc, OperandKind};

/// Instruction word class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// 16-bit compressed encoding.
    Compressed,
    /// 32-bit standard encoding.
    #[default]
    Standard,
    /// 32-bit encoding only available on RV64.
    Rv64,
}

impl Variant {
    /// Bits in the instruction word.
    pub const fn word_bits(self) -> u32 {
        match self {
            Self::Compressed => 16,
            Self::Standard | Self::Rv64 => 32,
        }
    }

    /// Bytes in the instruction word.
    pub const fn word_bytes(self) -> usize {
        match self {
            Self::Compressed => INSTRUCTION_SIZE_16,
            Self::Standard | Self::Rv64 => INSTRUCTION_SIZE_32,
        }
    }
}

/// Rounding or saturation annotation.
///
/// `{"rounding": "macun"}` declares this definition as the rounding form of
/// `macun`: it has no template of its own and is selected when the base
/// template matches a subtree that also adds `1 << (shift - 1)` before the final
/// shift. `"saturating"` flags results clamped instead of wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    /// Rounding form of the named base mnemonic.
    Rounding(String),
    /// Result saturates.
    Saturating,
}

/// One instruction of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDef {
    /// Mnemonic without namespace (`subincacc`).
    pub mnemonic: String,
    /// Word class.
    #[serde(default)]
    pub variant: Variant,
    /// Operands in assembly / intrinsic order.
    pub operands: Vec<OperandDesc>,
    /// Bit layout.
    pub encoding: EncodingLayout,
    /// Semantic template (S-expression).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Rounding / saturation marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    /// Explicit intrinsic alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic: Option<String>,
}

impl InstructionDef {
    /// Looks up an operand by name.
    pub fn operand(&self, name: &str) -> Option<&OperandDesc> {
        self.operands.iter().find(|op| op.name == name)
    }

    /// Index of an operand by name.
    pub fn operand_index(&self, name: &str) -> Option<usize> {
        self.operands.iter().position(|op| op.name == name)
    }

    /// Fixed-bit mask.
    pub fn mask(&self) -> u32 {
        self.encoding.mask()
    }

    /// Fixed-bit match value.
    pub fn match_bits(&self) -> u32 {
        self.encoding.match_bits()
    }

    /// Word bits not fixed by the encoding.
    pub fn free_bits(&self) -> u32 {
        self.variant.word_bits().saturating_sub(self.encoding.fixed_bit_count())
    }

    /// Base mnemonic when this is a rounding variant.
    pub fn rounds(&self) -> Option<&str> {
        match &self.marker {
            Some(Marker::Rounding(base)) => Some(base),
            _ => None,
        }
    }

    /// Whether the result saturates.
    pub fn is_saturating(&self) -> bool {
        matches!(self.marker, Some(Marker::Saturating))
    }

    /// Operands that intrinsic arguments bind to, in order.
    pub fn intrinsic_inputs(&self) -> impl Iterator<Item = (usize, &OperandDesc)> {
        self.operands.iter().enumerate().filter(|(_, op)| op.is_input())
    }

    /// The single register output, if there is exactly one.
    pub fn register_output(&self) -> Option<&OperandDesc> {
        let mut outs = self
            .operands
            .iter()
            .filter(|op| op.is_output() && op.kind == OperandKind::Register);
        match (outs.next(), outs.next()) {
            (Some(out), None) => Some(out),
            _ => None,
        }
    }

    /// C-level intrinsic signature.
    pub fn signature(&self, alias: &str) -> IntrinsicSignature {
        IntrinsicSignature {
            name: alias.to_owned(),
            ret: self.register_output().map(OperandDesc::c_type),
            params: self.intrinsic_inputs().map(|(_, op)| op.c_type()).collect(),
        }
    }
}

/// C prototype of an intrinsic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicSignature {
    /// Alias.
    pub name: String,
    /// Return type (`void` when absent).
    pub ret: Option<IntType>,
    /// Parameter types in call order.
    pub params: Vec<IntType>,
}

impl fmt::Display for IntrinsicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ret {
            Some(ty) => write!(f, "{} ", ty.c_name())?,
            None => f.write_str("void ")?,
        }
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&ty.c_name())?;
        }
        f.write_str(")")
    }
}
