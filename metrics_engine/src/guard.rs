//! 零值保护的算术工具，溢出与非正分母都折算为 0

use rust_decimal::Decimal;

pub(crate) const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// numer / denom，分母 ≤ 0 时为 0
pub(crate) fn ratio(numer: Decimal, denom: Decimal) -> Decimal {
    if denom <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numer.checked_div(denom).unwrap_or(Decimal::ZERO)
}

/// numer / denom × 100，分母 ≤ 0 时为 0
pub(crate) fn percent(numer: Decimal, denom: Decimal) -> Decimal {
    product(ratio(numer, denom), HUNDRED)
}

pub(crate) fn product(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::ZERO)
}
