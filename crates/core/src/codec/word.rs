//! Encoded instruction words.

use std::fmt;

use crate::common::constants::{
    INSTRUCTION_SIZE_16, INSTRUCTION_SIZE_32, LENGTH_PREFIX_32, LENGTH_PREFIX_MASK,
};
use crate::common::{Error, Result};
use crate::isa::instruction::Variant;

/// Width of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WordSize {
    /// 16-bit compressed word.
    Half,
    /// 32-bit word.
    Word,
}

impl WordSize {
    /// Word size used by a definition variant.
    pub const fn of(variant: Variant) -> Self {
        match variant {
            Variant::Compressed => Self::Half,
            Variant::Standard | Variant::Rv64 => Self::Word,
        }
    }

    /// Bits in the word.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Half => 16,
            Self::Word => 32,
        }
    }

    /// Bytes in the word.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Half => INSTRUCTION_SIZE_16,
            Self::Word => INSTRUCTION_SIZE_32,
        }
    }

    /// Size announced by the low bits of a word (`[1:0] == 0b11` is 32-bit).
    pub const fn from_prefix(low: u32) -> Self {
        if low & LENGTH_PREFIX_MASK == LENGTH_PREFIX_32 {
            Self::Word
        } else {
            Self::Half
        }
    }
}

/// A 16- or 32-bit instruction word.
///
/// Bits above the word size are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedWord {
    bits: u32,
    size: WordSize,
}

impl EncodedWord {
    /// Builds a word, discarding bits above `size`.
    pub const fn new(bits: u32, size: WordSize) -> Self {
        let bits = match size {
            WordSize::Half => bits & 0xFFFF,
            WordSize::Word => bits,
        };
        Self { bits, size }
    }

    /// A 32-bit word.
    pub const fn word(bits: u32) -> Self {
        Self::new(bits, WordSize::Word)
    }

    /// A 16-bit word.
    pub const fn half(bits: u16) -> Self {
        Self::new(bits as u32, WordSize::Half)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Word size.
    pub const fn size(self) -> WordSize {
        self.size
    }

    /// Little-endian bytes (2 or 4).
    pub fn to_le_bytes(self) -> Vec<u8> {
        self.bits.to_le_bytes()[..self.size.bytes()].to_vec()
    }

    /// Reads one word from the start of a little-endian stream, honoring the
    /// RISC-V length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the stream ends inside the word.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_at(bytes, 0)
    }

    pub(crate) fn read_at(bytes: &[u8], offset: usize) -> Result<Self> {
        let rest = bytes.get(offset..).unwrap_or_default();
        let Some(&first) = rest.first() else {
            return Err(Error::Truncated {
                offset,
                needed: INSTRUCTION_SIZE_16,
                available: 0,
            });
        };
        let size = WordSize::from_prefix(u32::from(first));
        if rest.len() < size.bytes() {
            return Err(Error::Truncated {
                offset,
                needed: size.bytes(),
                available: rest.len(),
            });
        }
        let bits = rest[..size.bytes()]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Ok(Self::new(bits, size))
    }
}

impl fmt::Display for EncodedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            WordSize::Half => write!(f, "{:#06x}", self.bits),
            WordSize::Word => write!(f, "{:#010x}", self.bits),
        }
    }
}
