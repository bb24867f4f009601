use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Fixed-point 1.0.
pub const FIXED_ONE: Fixed64 = Fixed64::from_bits(1 << 32);

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Integer amount as Fixed64, saturating at the largest representable value
/// instead of panicking.
#[inline]
pub fn fixed_from_int(v: impl Into<u64>) -> Fixed64 {
    Fixed64::saturating_from_num(v.into())
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Ratio `num / den` clamped to `[0, 1]`. A zero denominator counts as fully
/// satisfied.
#[inline]
pub fn unit_ratio(num: Fixed64, den: Fixed64) -> Fixed64 {
    if den <= Fixed64::ZERO {
        return FIXED_ONE;
    }
    match num.checked_div(den) {
        Some(r) => r.clamp(Fixed64::ZERO, FIXED_ONE),
        None => FIXED_ONE,
    }
}

/// Whole units contained in a non-negative fixed-point amount.
#[inline]
pub fn whole_units(v: Fixed64) -> u32 {
    v.max(Fixed64::ZERO).floor().saturating_to_num::<u32>()
}

/// Scale a fixed-point value to an integer percentage (1.0 -> 100).
#[inline]
pub fn to_percent(v: Fixed64) -> i64 {
    (v * Fixed64::from_num(100)).round().saturating_to_num::<i64>()
}
