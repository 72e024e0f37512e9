//! Native integer types of expression nodes.

use std::fmt;

/// An integer type as the source program computes it: width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntType {
    /// Width in bits.
    pub bits: u32,
    /// Two's complement when `true`.
    pub signed: bool,
}

impl IntType {
    /// `uint8_t`
    pub const U8: Self = Self::new(8, false);
    /// `uint16_t`
    pub const U16: Self = Self::new(16, false);
    /// `uint32_t`
    pub const U32: Self = Self::new(32, false);
    /// `uint64_t`
    pub const U64: Self = Self::new(64, false);
    /// `int8_t`
    pub const I8: Self = Self::new(8, true);
    /// `int16_t`
    pub const I16: Self = Self::new(16, true);
    /// `int32_t`
    pub const I32: Self = Self::new(32, true);
    /// `int64_t`
    pub const I64: Self = Self::new(64, true);

    /// Builds a type.
    pub const fn new(bits: u32, signed: bool) -> Self {
        Self { bits, signed }
    }

    /// Parses a C type name (`uint32_t`, `unsigned long`, `u16`, `int`, ...).
    pub fn from_c_name(name: &str) -> Option<Self> {
        let words: Vec<&str> = name.split_whitespace().collect();
        let ty = match words.as_slice() {
            ["u8" | "uint8_t" | "uint8"] => Self::U8,
            ["u16" | "uint16_t" | "uint16"] => Self::U16,
            ["u32" | "uint32_t" | "uint32"] => Self::U32,
            ["u64" | "uint64_t" | "uint64"] => Self::U64,
            ["i8" | "int8_t" | "int8"] => Self::I8,
            ["i16" | "int16_t" | "int16"] => Self::I16,
            ["i32" | "int32_t" | "int32" | "int"] | ["signed"] | ["signed", "int"] => Self::I32,
            ["i64" | "int64_t" | "int64" | "long"] | ["long", "long"] => Self::I64,
            ["char"] | ["signed", "char"] => Self::I8,
            ["unsigned", "char"] => Self::U8,
            ["short"] | ["short", "int"] => Self::I16,
            ["unsigned", "short"] | ["unsigned", "short", "int"] => Self::U16,
            ["unsigned"] | ["unsigned", "int"] => Self::U32,
            ["unsigned", "long"] | ["unsigned", "long", "long"] => Self::U64,
            _ => return None,
        };
        Some(ty)
    }

    /// The `<stdint.h>` spelling of this type.
    pub fn c_name(self) -> String {
        format!("{}int{}_t", if self.signed { "" } else { "u" }, self.bits)
    }

    /// Integer promotion: at least 32 bits, signedness kept.
    pub const fn promoted(self) -> Self {
        if self.bits < 32 {
            Self::new(32, self.signed)
        } else {
            self
        }
    }

    /// Result type of a binary arithmetic operation.
    ///
    /// Both operands are promoted; the wider type wins, and at equal width
    /// unsigned wins.
    pub const fn common(a: Self, b: Self) -> Self {
        let a = a.promoted();
        let b = b.promoted();
        if a.bits > b.bits {
            a
        } else if b.bits > a.bits {
            b
        } else {
            Self::new(a.bits, a.signed && b.signed)
        }
    }

    /// Whether a value of `width` bits (two's complement if `signed`) is
    /// representable in this type.
    pub const fn holds(self, width: u32, signed: bool) -> bool {
        match (self.signed, signed) {
            (true, true) => width <= self.bits,
            (true, false) => width < self.bits,
            (false, false) => width <= self.bits,
            (false, true) => false,
        }
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.signed { 'i' } else { 'u' }, self.bits)
    }
}
