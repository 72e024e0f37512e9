//! Instruction encoding layouts.
//!
//! A layout is a set of *fixed* bit ranges (opcode, funct fields) and a set of
//! *field segments* that carry operand bits. It provides:
//! 1. **Masks:** The fixed-bit mask and match value used for decoding.
//! 2. **Segments:** Per-operand segment lists, allowing split immediates.
//! 3. **Validation:** Bounds, overlap, and coverage checks run at registry load.

use serde::{Deserialize, Serialize};

use crate::common::bits::{low_mask, range_mask};

/// A fixed bit range and its required value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedBits {
    /// Highest bit (inclusive).
    pub hi: u32,
    /// Lowest bit (inclusive).
    pub lo: u32,
    /// Value of the range, right-aligned.
    pub value: u32,
}

/// A contiguous run of word bits carrying part of one operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSegment {
    /// Operand this segment belongs to.
    pub operand: String,
    /// Highest word bit (inclusive).
    pub hi: u32,
    /// Lowest word bit (inclusive).
    pub lo: u32,
    /// Position of the segment's lowest bit inside the operand value.
    #[serde(default)]
    pub offset: u32,
}

impl FieldSegment {
    /// Number of bits in the segment.
    pub const fn len(&self) -> u32 {
        self.hi - self.lo + 1
    }

    /// Mask of the operand value bits carried by this segment.
    pub const fn value_mask(&self) -> u64 {
        low_mask(self.len()) << self.offset
    }
}

/// Fixed bits plus operand fields of one instruction word.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncodingLayout {
    /// Opcode / funct ranges with their required values.
    #[serde(default)]
    pub fixed: Vec<FixedBits>,
    /// Operand field segments.
    #[serde(default)]
    pub fields: Vec<FieldSegment>,
}

impl EncodingLayout {
    /// Standard R-type layout: `funct7 | rs2 | rs1 | funct3 | rd | opcode`.
    pub fn r_type(opcode: u32, funct3: u32, funct7: u32) -> Self {
        Self {
            fixed: vec![
                FixedBits { hi: 31, lo: 25, value: funct7 },
                FixedBits { hi: 14, lo: 12, value: funct3 },
                FixedBits { hi: 6, lo: 0, value: opcode },
            ],
            fields: vec![
                FieldSegment::whole("rs2", 24, 20),
                FieldSegment::whole("rs1", 19, 15),
                FieldSegment::whole("rd", 11, 7),
            ],
        }
    }

    /// Union of the fixed ranges.
    pub fn mask(&self) -> u32 {
        self.fixed.iter().fold(0, |acc, f| acc | range_mask(f.hi, f.lo))
    }

    /// Required value of the fixed bits.
    pub fn match_bits(&self) -> u32 {
        self.fixed.iter().fold(0, |acc, f| {
            let width = f.hi.saturating_sub(f.lo) + 1;
            acc | (((f.value as u64 & low_mask(width)) as u32) << f.lo.min(31))
        })
    }

    /// Number of fixed bits.
    pub fn fixed_bit_count(&self) -> u32 {
        self.mask().count_ones()
    }

    /// Segments carrying bits of `operand`.
    pub fn segments<'a>(&'a self, operand: &'a str) -> impl Iterator<Item = &'a FieldSegment> + 'a {
        self.fields.iter().filter(move |s| s.operand == operand)
    }

    /// Total encoded bits of `operand` and the mask of value bits they cover.
    pub fn coverage(&self, operand: &str) -> (u32, u64) {
        self.segments(operand)
            .fold((0, 0), |(bits, mask), s| (bits + s.len(), mask | s.value_mask()))
    }

    /// Checks bounds, overlap, coverage, and the RISC-V length prefix.
    ///
    /// Returns a description of the first violation.
    pub(crate) fn check(&self, word_bits: u32) -> Result<(), String> {
        let mut used = 0u32;
        let ranges = self
            .fixed
            .iter()
            .map(|f| (f.hi, f.lo, "fixed bits".to_owned()))
            .chain(
                self.fields
                    .iter()
                    .map(|s| (s.hi, s.lo, format!("field `{}`", s.operand))),
            );
        for (hi, lo, what) in ranges {
            if hi < lo {
                return Err(format!("{what} [{hi}:{lo}] has hi < lo"));
            }
            if hi >= word_bits {
                return Err(format!("{what} [{hi}:{lo}] exceeds the {word_bits}-bit word"));
            }
            let bits = range_mask(hi, lo);
            if used & bits != 0 {
                return Err(format!("{what} [{hi}:{lo}] overlaps another range"));
            }
            used |= bits;
        }
        for f in &self.fixed {
            if u64::from(f.value) > low_mask(f.hi - f.lo + 1) {
                return Err(format!(
                    "fixed value {:#x} does not fit [{}:{}]",
                    f.value, f.hi, f.lo
                ));
            }
        }
        let word_mask = low_mask(word_bits) as u32;
        if used != word_mask {
            return Err(format!(
                "bits {:#x} of the {word_bits}-bit word are not covered",
                word_mask & !used
            ));
        }

        let prefix_fixed = self.mask() & 0b11 == 0b11;
        let prefix = self.match_bits() & 0b11;
        match (word_bits, prefix_fixed, prefix) {
            (32, true, 0b11) | (16, true, 0b00..=0b10) => Ok(()),
            (32, _, _) => Err("32-bit encodings must fix bits [1:0] = 0b11".to_owned()),
            _ => Err("16-bit encodings must fix bits [1:0] to a value other than 0b11".to_owned()),
        }
    }
}

impl FieldSegment {
    /// A segment carrying the operand's low bits.
    pub fn whole(operand: &str, hi: u32, lo: u32) -> Self {
        Self {
            operand: operand.to_owned(),
            hi,
            lo,
            offset: 0,
        }
    }
}
