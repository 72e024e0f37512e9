//! Operand descriptors.
//!
//! An operand is either a register (an index `x0..x31`, possibly biased for
//! compressed fields) or an immediate of a declared width and signedness. The
//! `width` of a register operand is the width of the *value* the instruction
//! reads or writes, which is what the matcher compares against inferred widths.

use serde::{Deserialize, Serialize};

use crate::common::bits::storage_width;
use crate::expr::IntType;

/// Register or immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// General purpose register operand.
    Register,
    /// Immediate encoded in the instruction word.
    Immediate,
}

/// Data direction of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Read only.
    #[default]
    In,
    /// Written only.
    Out,
    /// Read and written (accumulators).
    #[serde(alias = "in_out")]
    InOut,
}

/// One operand of an instruction definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandDesc {
    /// Placeholder name used by fields, templates, and bindings.
    pub name: String,
    /// Register or immediate.
    pub kind: OperandKind,
    /// Value width in bits.
    pub width: u32,
    /// Whether the value is interpreted as two's complement.
    #[serde(default)]
    pub signed: bool,
    /// Read/write direction.
    #[serde(default)]
    pub direction: Direction,
    /// Register number encoded as zero (8 for compressed `x8..x15` fields).
    #[serde(default)]
    pub bias: u32,
}

impl OperandDesc {
    /// Whether the instruction reads this operand.
    pub const fn is_input(&self) -> bool {
        matches!(self.direction, Direction::In | Direction::InOut)
    }

    /// Whether the instruction writes this operand.
    pub const fn is_output(&self) -> bool {
        matches!(self.direction, Direction::Out | Direction::InOut)
    }

    /// Whether this is a register operand.
    pub const fn is_register(&self) -> bool {
        matches!(self.kind, OperandKind::Register)
    }

    /// Inclusive range of legal immediate values for this operand's width.
    pub const fn immediate_range(&self) -> (i64, i64) {
        let w = if self.width > 63 {
            63
        } else if self.width == 0 {
            1
        } else {
            self.width
        };
        if self.signed {
            (-(1i64 << (w - 1)), (1i64 << (w - 1)) - 1)
        } else {
            (0, ((1u64 << w) - 1) as i64)
        }
    }

    /// Integer type of this operand's value.
    pub const fn value_type(&self) -> IntType {
        IntType::new(self.width, self.signed)
    }

    /// C type used in the intrinsic signature (width rounded up to a power of two, at least 8).
    pub const fn c_type(&self) -> IntType {
        IntType::new(storage_width(self.width), self.signed)
    }
}
