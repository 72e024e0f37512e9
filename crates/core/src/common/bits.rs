//! Bit-field helpers shared by the codec, the registry validator, and the width analyzer.

/// Mask with the low `bits` bits set (saturates at 64).
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Mask covering the inclusive bit range `hi..=lo` of a 32-bit word.
pub const fn range_mask(hi: u32, lo: u32) -> u32 {
    if hi < lo || lo >= 32 {
        return 0;
    }
    let hi = if hi > 31 { 31 } else { hi };
    (low_mask(hi - lo + 1) as u32) << lo
}

/// Sign-extends the low `bits` bits of `value`.
pub const fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits == 0 {
        return 0;
    }
    if bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Whether `value` is representable as an unsigned `bits`-bit integer.
pub fn fits_unsigned(value: i128, bits: u32) -> bool {
    value >= 0 && (bits >= 127 || value < (1i128 << bits))
}

/// Whether `value` is representable as a two's complement `bits`-bit integer.
pub fn fits_signed(value: i128, bits: u32) -> bool {
    if bits == 0 {
        return false;
    }
    if bits >= 127 {
        return true;
    }
    let half = 1i128 << (bits - 1);
    (-half..half).contains(&value)
}

/// Minimal width of a constant and whether that width is two's complement.
///
/// Non-negative values use their unsigned width (zero takes one bit); negative
/// values use their two's complement width.
pub const fn value_width(value: i128) -> (u32, bool) {
    if value >= 0 {
        let bits = 128 - value.leading_zeros();
        (if bits == 0 { 1 } else { bits }, false)
    } else {
        (128 - (!value).leading_zeros() + 1, true)
    }
}

/// Smallest power of two that is at least `bits` and at least 8.
pub const fn storage_width(bits: u32) -> u32 {
    if bits <= 8 { 8 } else { bits.next_power_of_two() }
}

/// If `value` is `2^k - 1` for some `k >= 1`, returns `k`.
pub const fn full_mask_width(value: i128) -> Option<u32> {
    if value > 0 && (value & value.wrapping_add(1)) == 0 {
        Some(128 - value.leading_zeros())
    } else {
        None
    }
}
