//! The three validation gates.
//!
//! Gates run in a fixed order and the first rejection wins:
//!
//! ```text
//! 1. reserve sanity   answer >= 0
//! 2. divergence       |reserve - tvl| * 1e18 / max(reserve, tvl) <= max_difference
//! 3. bounds           MIN_RATE <= tvl * 1e18 / total_supply <= MAX_RATE
//! ```
//!
//! All divisions truncate. Everything here is a pure function of its
//! arguments; reading the feed, authorization and persistence live in
//! [`validator`](crate::validator).

use rategate_types::{RateEvent, Timestamp, I256, MAX_RATE, MIN_RATE, RATE_PRECISION_FACTOR, U256};

use crate::{RateError, Result};

/// Outcome of running the gates over one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Gate 1: the oracle answer is negative.
    InvalidReserve {
        /// The raw oracle answer.
        reserve: I256,
    },
    /// Gate 2: oracle reserve and caller TVL diverge too much.
    ExcessiveDifference {
        reserve: U256,
        tvl: U256,
        /// Relative difference, scale 1e18.
        difference: U256,
    },
    /// Gate 3: the computed rate falls outside the parity band.
    RateOutOfBounds {
        /// The rejected rate; never persisted.
        rate: U256,
    },
    /// Every gate passed.
    Accepted {
        rate: U256,
    },
}

impl GateVerdict {
    /// Whether the observation may be committed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The event reporting this verdict.
    pub fn to_event(&self, timestamp: Timestamp) -> RateEvent {
        match *self {
            Self::InvalidReserve { reserve } => RateEvent::AlertInvalidReserve { reserve, timestamp },
            Self::ExcessiveDifference { reserve, tvl, .. } => {
                RateEvent::AlertInvalidReserveDifference {
                    reserve,
                    tvl,
                    timestamp,
                }
            }
            Self::RateOutOfBounds { rate } => RateEvent::AlertInvalidRate { rate, timestamp },
            Self::Accepted { rate } => RateEvent::LatestRateUpdated { rate, timestamp },
        }
    }
}

/// Gate 1: a non-negative answer converted to an unsigned reserve.
///
/// Returns `None` when the answer is negative.
pub fn check_reserve(answer: I256) -> Option<U256> {
    if answer.is_negative() {
        None
    } else {
        Some(answer.as_u256())
    }
}

/// Relative difference between `reserve` and `tvl`, scale 1e18.
///
/// Divides by the larger of the two operands, so the metric is symmetric in
/// its arguments and never exceeds 1e18. Two zero operands have zero
/// difference.
///
/// # Errors
///
/// [`RateError::Overflow`] if `|reserve - tvl| * 1e18` exceeds 256 bits.
pub fn relative_difference(reserve: U256, tvl: U256) -> Result<U256> {
    let (larger, smaller) = if reserve >= tvl {
        (reserve, tvl)
    } else {
        (tvl, reserve)
    };
    if larger == U256::ZERO {
        return Ok(U256::ZERO);
    }
    let gap = larger - smaller;
    let scaled = gap
        .checked_mul(RATE_PRECISION_FACTOR)
        .ok_or(RateError::Overflow("relative difference"))?;
    Ok(scaled / larger)
}

/// Gate 2: whether `difference` is within `max_difference` (inclusive).
pub fn within_max_difference(difference: U256, max_difference: U256) -> bool {
    difference <= max_difference
}

/// `tvl * 1e18 / total_supply`, truncating.
///
/// # Errors
///
/// - [`RateError::ZeroTotalSupply`] if `total_supply` is zero
/// - [`RateError::Overflow`] if `tvl * 1e18` exceeds 256 bits
pub fn compute_rate(tvl: U256, total_supply: U256) -> Result<U256> {
    if total_supply == U256::ZERO {
        return Err(RateError::ZeroTotalSupply);
    }
    let scaled = tvl
        .checked_mul(RATE_PRECISION_FACTOR)
        .ok_or(RateError::Overflow("rate"))?;
    Ok(scaled / total_supply)
}

/// Gate 3: whether `rate` lies in `[MIN_RATE, MAX_RATE]`.
pub fn within_bounds(rate: U256) -> bool {
    (MIN_RATE..=MAX_RATE).contains(&rate)
}

/// Run all three gates over one observation.
///
/// # Errors
///
/// Hard failures only: [`RateError::ZeroTotalSupply`] (checked before any
/// gate) and [`RateError::Overflow`]. Gate rejections are verdicts, not
/// errors.
pub fn evaluate(
    answer: I256,
    total_supply: U256,
    tvl: U256,
    max_difference: U256,
) -> Result<GateVerdict> {
    if total_supply == U256::ZERO {
        return Err(RateError::ZeroTotalSupply);
    }

    let Some(reserve) = check_reserve(answer) else {
        return Ok(GateVerdict::InvalidReserve { reserve: answer });
    };

    let difference = relative_difference(reserve, tvl)?;
    if !within_max_difference(difference, max_difference) {
        return Ok(GateVerdict::ExcessiveDifference {
            reserve,
            tvl,
            difference,
        });
    }

    let rate = compute_rate(tvl, total_supply)?;
    if !within_bounds(rate) {
        return Ok(GateVerdict::RateOutOfBounds { rate });
    }

    Ok(GateVerdict::Accepted { rate })
}
