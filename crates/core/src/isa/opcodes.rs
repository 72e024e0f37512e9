//! RISC-V major opcode map.
//!
//! Classifies 32-bit encodings by bits `[6:2]` so the registry can tell whether a
//! custom instruction lives in one of the four spaces reserved for vendor use.

use std::fmt;

use crate::common::constants::{
    LENGTH_PREFIX_32, LENGTH_PREFIX_MASK, MAJOR_OPCODE_MASK, MAJOR_OPCODE_SHIFT,
};

/// The 32 major opcodes of the base 32-bit encoding space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MajorOpcode {
    Load,
    LoadFp,
    Custom0,
    MiscMem,
    OpImm,
    Auipc,
    OpImm32,
    Store,
    StoreFp,
    Custom1,
    Amo,
    Op,
    Lui,
    Op32,
    Madd,
    Msub,
    Nmsub,
    Nmadd,
    OpFp,
    OpV,
    Custom2,
    Branch,
    Jalr,
    Reserved,
    Jal,
    System,
    OpVe,
    Custom3,
    /// Codes 0b00111_11 / 0b01111_11 / 0b11111_11 announce instructions longer than 32 bits.
    Long,
}

impl MajorOpcode {
    /// Classifies a 32-bit word; `None` for 16-bit (compressed) encodings.
    pub const fn from_word(word: u32) -> Option<Self> {
        if word & LENGTH_PREFIX_MASK != LENGTH_PREFIX_32 {
            return None;
        }
        Some(Self::from_bits((word >> MAJOR_OPCODE_SHIFT) & MAJOR_OPCODE_MASK))
    }

    const fn from_bits(bits: u32) -> Self {
        match bits {
            0b00_000 => Self::Load,
            0b00_001 => Self::LoadFp,
            0b00_010 => Self::Custom0,
            0b00_011 => Self::MiscMem,
            0b00_100 => Self::OpImm,
            0b00_101 => Self::Auipc,
            0b00_110 => Self::OpImm32,
            0b01_000 => Self::Store,
            0b01_001 => Self::StoreFp,
            0b01_010 => Self::Custom1,
            0b01_011 => Self::Amo,
            0b01_100 => Self::Op,
            0b01_101 => Self::Lui,
            0b01_110 => Self::Op32,
            0b10_000 => Self::Madd,
            0b10_001 => Self::Msub,
            0b10_010 => Self::Nmsub,
            0b10_011 => Self::Nmadd,
            0b10_100 => Self::OpFp,
            0b10_101 => Self::OpV,
            0b10_110 => Self::Custom2,
            0b11_000 => Self::Branch,
            0b11_001 => Self::Jalr,
            0b11_010 => Self::Reserved,
            0b11_011 => Self::Jal,
            0b11_100 => Self::System,
            0b11_101 => Self::OpVe,
            0b11_110 => Self::Custom3,
            _ => Self::Long,
        }
    }

    /// Whether the opcode space is set aside for custom extensions.
    pub const fn is_custom(self) -> bool {
        matches!(
            self,
            Self::Custom0 | Self::Custom1 | Self::Custom2 | Self::Custom3 | Self::Reserved
        )
    }
}

impl fmt::Display for MajorOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "LOAD",
            Self::LoadFp => "LOAD-FP",
            Self::Custom0 => "custom-0",
            Self::MiscMem => "MISC-MEM",
            Self::OpImm => "OP-IMM",
            Self::Auipc => "AUIPC",
            Self::OpImm32 => "OP-IMM-32",
            Self::Store => "STORE",
            Self::StoreFp => "STORE-FP",
            Self::Custom1 => "custom-1",
            Self::Amo => "AMO",
            Self::Op => "OP",
            Self::Lui => "LUI",
            Self::Op32 => "OP-32",
            Self::Madd => "MADD",
            Self::Msub => "MSUB",
            Self::Nmsub => "NMSUB",
            Self::Nmadd => "NMADD",
            Self::OpFp => "OP-FP",
            Self::OpV => "OP-V",
            Self::Custom2 => "custom-2",
            Self::Branch => "BRANCH",
            Self::Jalr => "JALR",
            Self::Reserved => "reserved",
            Self::Jal => "JAL",
            Self::System => "SYSTEM",
            Self::OpVe => "OP-VE",
            Self::Custom3 => "custom-3",
            Self::Long => ">32b",
        };
        f.write_str(name)
    }
}
