//! Fixed-precision rational arithmetic: rounding a quantity to a step size.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::error::{CoreError, Result};

/// Returns the greatest multiple of `step` that is `<= x` (when `down`), or the
/// smallest multiple that is `>= x` (when `!down`).
///
/// `step` is normalized first so trailing zeros in its representation don't
/// change the result (`0.01000000` behaves identically to `0.01`).
pub fn quantize(x: Decimal, step: Decimal, down: bool) -> Result<Decimal> {
    if step <= Decimal::ZERO {
        return Err(CoreError::InvalidStep(step));
    }
    let step = step.normalize();

    let ratio = x / step;
    let rounded = if down {
        ratio.round_dp_with_strategy(0, RoundingStrategy::ToZero)
    } else {
        ratio.round_dp_with_strategy(0, RoundingStrategy::AwayFromZero)
    };
    Ok(rounded * step)
}
