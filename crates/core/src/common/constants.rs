//! Architectural constants for RISC-V instruction words.

/// Size in bytes of a standard (32-bit) instruction.
pub const INSTRUCTION_SIZE_32: usize = 4;

/// Size in bytes of a compressed (16-bit) instruction.
pub const INSTRUCTION_SIZE_16: usize = 2;

/// Bits `[1:0]` of a 32-bit instruction; any other value marks a 16-bit one.
pub const LENGTH_PREFIX_32: u32 = 0b11;

/// Mask for the length-encoding bits `[1:0]`.
pub const LENGTH_PREFIX_MASK: u32 = 0b11;

/// Number of integer registers (`x0`..`x31`).
pub const REGISTER_COUNT: u32 = 32;

/// Bit position of the 5-bit major opcode field `[6:2]`.
pub const MAJOR_OPCODE_SHIFT: u32 = 2;

/// Mask for the major opcode field after shifting.
pub const MAJOR_OPCODE_MASK: u32 = 0x1F;

/// Most terms one sum match can track; taken terms are bits of a `u64`.
pub const SUM_TERMS_LIMIT: usize = 64;

/// Supported register widths.
pub const XLEN_32: u32 = 32;

/// Supported register widths.
pub const XLEN_64: u32 = 64;
