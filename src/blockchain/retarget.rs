use std::time::Duration;

use chrono::NaiveDateTime;
use log::debug;
use num_bigint::BigUint;

use super::{MAX_TARGET_BLOCK_TIME_SECS, compact};
use crate::error::RetargetError;

/// Smallest target that still encodes with a compact exponent of 3.
pub fn min_target() -> BigUint {
    BigUint::from(1u32) << 16
}

/// Largest 256-bit target.
pub fn max_target() -> BigUint {
    (BigUint::from(1u32) << 256) - 1u32
}

/// Desired duration of a whole window: `per_block * window`.
pub fn desired_timespan(per_block: Duration, window: usize) -> Result<Duration, RetargetError> {
    if per_block.is_zero() || window == 0 {
        return Err(RetargetError::ZeroTimespan);
    }
    if per_block > Duration::from_secs(MAX_TARGET_BLOCK_TIME_SECS) {
        return Err(RetargetError::TimespanOverflow);
    }
    u32::try_from(window)
        .ok()
        .and_then(|window| per_block.checked_mul(window))
        .ok_or(RetargetError::TimespanOverflow)
}

/// Scale the target of `prev_bits` by `observed / desired` and return it
/// unencoded.
///
/// Observed time is measured in microseconds. A non-positive observed span
/// counts as one microsecond, and the result is clamped to
/// `[min_target(), max_target()]` so the target never degenerates.
pub fn retarget_target(
    prev_bits: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
    desired: Duration,
) -> Result<BigUint, RetargetError> {
    let desired_us = desired.as_micros();
    if desired_us == 0 {
        return Err(RetargetError::ZeroTimespan);
    }

    let prev_target = compact::decode(prev_bits)?;
    let observed_us = (end - start).num_microseconds().unwrap_or(i64::MAX).max(1) as u128;

    let scaled = prev_target * BigUint::from(observed_us) / BigUint::from(desired_us);
    let clamped = scaled.clamp(min_target(), max_target());

    debug!(
        "retarget: bits={:#010x} observed={}us desired={}us",
        prev_bits, observed_us, desired_us
    );
    Ok(clamped)
}

/// New compact bits for the next difficulty period.
pub fn retarget(
    prev_bits: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
    desired: Duration,
) -> Result<u32, RetargetError> {
    let target = retarget_target(prev_bits, start, end, desired)?;
    Ok(compact::encode(&target)?)
}
