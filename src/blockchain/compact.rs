use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::CompactError;

/// Exponent of the difficulty-one target (`0x1EFFFFFF`).
const DIFFICULTY_ONE_EXPONENT: u32 = 0x1E;

/// Expand compact `bits` into the full 256-bit target:
/// `mantissa * 2^(8 * (exponent - 3))`.
pub fn decode(bits: u32) -> Result<BigUint, CompactError> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x00FF_FFFF;
    if exponent < 3 {
        return Err(CompactError::ExponentTooSmall(exponent));
    }
    Ok(BigUint::from(mantissa) << (8 * (exponent as usize - 3)))
}

/// Pack a target into compact `bits`.
///
/// The exponent is the target's byte length; the mantissa keeps only the top
/// three bytes, so `decode(encode(t)) <= t` and the low bytes are lost.
pub fn encode(target: &BigUint) -> Result<u32, CompactError> {
    if target.is_zero() {
        return Err(CompactError::ZeroTarget);
    }
    let byte_len = target.bits().div_ceil(8);
    if byte_len < 3 {
        return Err(CompactError::ExponentTooSmall(byte_len as u32));
    }
    if byte_len > 0xFF {
        return Err(CompactError::TargetTooLarge(byte_len));
    }
    let exponent = byte_len as u32;
    let mantissa = (target >> (8 * (byte_len as usize - 3)))
        .to_u32()
        .unwrap_or(0x00FF_FFFF);
    Ok((exponent << 24) | mantissa)
}

/// How much harder `bits` is than the difficulty-one target.
pub fn difficulty_from_bits(bits: u32) -> Result<f64, CompactError> {
    let target = decode(bits)?;
    if target.is_zero() {
        return Err(CompactError::ZeroTarget);
    }
    let one = BigUint::from(0x00FF_FFFFu32) << (8 * (DIFFICULTY_ONE_EXPONENT as usize - 3));
    let one = one.to_f64().unwrap_or(f64::MAX);
    let target = target.to_f64().unwrap_or(f64::MAX);
    Ok(one / target)
}

/// Numeric value of a hex digest, for comparison against a target.
pub fn hash_value(hash_hex: &str) -> Option<BigUint> {
    BigUint::parse_bytes(hash_hex.as_bytes(), 16)
}
