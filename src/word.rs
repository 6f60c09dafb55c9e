//! 256-bit word operations on top of `primitive_types::U256`.
//!
//! Words wrap on overflow. Signed operations use two's complement and
//! truncate toward zero; division and modulo by zero yield zero. The
//! 512-bit intermediates keep ADDMOD/MULMOD exact across wraparound.

use primitive_types::{U256, U512};

/// Sign bit of a word under two's-complement interpretation.
pub fn is_negative(value: &U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation. `negate(0) == 0`, `negate(INT_MIN) == INT_MIN`.
pub fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs_sign(value: U256) -> (U256, bool) {
    if is_negative(&value) {
        (negate(value), true)
    } else {
        (value, false)
    }
}

fn low_u256(value: U512) -> U256 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

/// Unsigned division; divisor zero yields zero.
pub fn div(a: U256, b: U256) -> U256 {
    a.checked_div(b).unwrap_or_default()
}

/// Unsigned modulo; modulus zero yields zero.
pub fn rem(a: U256, b: U256) -> U256 {
    a.checked_rem(b).unwrap_or_default()
}

/// Signed division, truncating toward zero. `INT_MIN / -1 == INT_MIN`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let (abs_a, neg_a) = abs_sign(a);
    let (abs_b, neg_b) = abs_sign(b);
    let quotient = abs_a / abs_b;
    if neg_a ^ neg_b {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed modulo; the result carries the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let (abs_a, neg_a) = abs_sign(a);
    let (abs_b, _) = abs_sign(b);
    let remainder = abs_a % abs_b;
    if neg_a {
        negate(remainder)
    } else {
        remainder
    }
}

/// `(a + b) % modulus` without intermediate wraparound; modulus zero yields zero.
pub fn addmod(a: U256, b: U256, modulus: U256) -> U256 {
    if modulus.is_zero() {
        return U256::zero();
    }
    low_u256((U512::from(a) + U512::from(b)) % U512::from(modulus))
}

/// `(a * b) % modulus` over the full 512-bit product; modulus zero yields zero.
pub fn mulmod(a: U256, b: U256, modulus: U256) -> U256 {
    if modulus.is_zero() {
        return U256::zero();
    }
    low_u256((U512::from(a) * U512::from(b)) % U512::from(modulus))
}

/// Truncating exponentiation.
pub fn exp(base: U256, exponent: U256) -> U256 {
    base.overflowing_pow(exponent).0
}

/// Logical shift left; shifts of 256 or more yield zero.
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// Logical shift right; shifts of 256 or more yield zero.
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic shift right. Shifts of 256 or more collapse to all-zeros or
/// all-ones, mirroring the sign bit.
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(&value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if shift == 0 {
        return value;
    }
    let shifted = value >> shift;
    if negative {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

/// Signed less-than.
pub fn slt(a: &U256, b: &U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        // Equal signs: two's-complement order matches unsigned order.
        _ => a < b,
    }
}

/// Byte at big-endian position `offset` of `value`; offsets past 31 yield zero.
pub fn byte(offset: U256, value: U256) -> U256 {
    if offset >= U256::from(32) {
        return U256::zero();
    }
    // U256::byte indexes from the least significant end.
    U256::from(value.byte(31 - offset.low_u64() as usize))
}

/// Sign-extend `value` from the byte at index `index` (0 = least
/// significant). Indices of 31 and above leave the value unchanged.
pub fn signextend(index: U256, value: U256) -> U256 {
    let index = if index >= U256::from(31) {
        31
    } else {
        index.low_u64()
    };
    let sign_position = (8 * index + 7) as usize;
    if sign_position == 255 {
        return value;
    }
    let mask = (U256::one() << (sign_position + 1)) - U256::one();
    if value.bit(sign_position) {
        value | !mask
    } else {
        value & mask
    }
}

/// Minimal big-endian byte length of `value`; zero for zero.
pub fn significant_bytes(value: &U256) -> u64 {
    ((value.bits() + 7) / 8) as u64
}

/// 1 for true, 0 for false.
pub fn from_bool(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}
