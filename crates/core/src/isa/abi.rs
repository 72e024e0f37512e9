//! RISC-V Application Binary Interface (ABI) register names.
//!
//! Maps integer register indices to their calling-convention names and parses
//! register operands written either way (`x10` or `a0`).

use crate::common::constants::REGISTER_COUNT;

/// Register x8 (frame pointer, s0/fp); first register reachable by compressed fields.
pub const REG_S0: u32 = 8;
/// Register x10 (first argument/return value, a0).
pub const REG_A0: u32 = 10;

/// ABI register names for x0–x31.
const REG_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// ABI name of an integer register, if `idx` is in range.
pub fn abi_name(idx: u32) -> Option<&'static str> {
    REG_NAMES.get(idx as usize).copied()
}

/// Parses `x<N>`, an ABI name, or the `fp` alias into a register index.
pub fn parse_register(text: &str) -> Option<u32> {
    let text = text.trim();
    if text == "fp" {
        return Some(REG_S0);
    }
    if let Some(num) = text.strip_prefix('x')
        && !num.is_empty()
        && num.bytes().all(|b| b.is_ascii_digit())
    {
        return num.parse::<u32>().ok().filter(|&n| n < REGISTER_COUNT);
    }
    REG_NAMES
        .iter()
        .position(|&name| name == text)
        .map(|idx| idx as u32)
}
