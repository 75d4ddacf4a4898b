//! 數量精度處理
//!
//! 分配過程中的小數數量會因多次拆分產生極小殘差，
//! 所有數量運算後都應以 [`snap`] 將殘差歸零。

use rust_decimal::Decimal;

/// 數量容差（小於此值視為零）
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// 將容差內的殘差歸零
pub fn snap(qty: Decimal) -> Decimal {
    if qty.abs() <= EPSILON {
        Decimal::ZERO
    } else {
        qty
    }
}

/// 檢查數量是否視為零
pub fn approx_zero(qty: Decimal) -> bool {
    qty.abs() <= EPSILON
}

/// 檢查 `a ≤ b`（容差內）
pub fn approx_le(a: Decimal, b: Decimal) -> bool {
    a <= b + EPSILON
}

/// 檢查 `a ≥ b`（容差內）
pub fn approx_ge(a: Decimal, b: Decimal) -> bool {
    a + EPSILON >= b
}

/// 檢查 `a == b`（容差內）
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_zero() {
        let residue = Decimal::from_parts(1, 0, 0, false, 10); // 1e-10
        assert_eq!(snap(residue), Decimal::ZERO);
        assert_eq!(snap(-residue), Decimal::ZERO);

        // 超過容差的數量不受影響
        let qty = Decimal::new(5, 1); // 0.5
        assert_eq!(snap(qty), qty);
    }

    #[test]
    fn test_approx_comparisons() {
        let a = Decimal::from(10);
        let b = a + Decimal::from_parts(1, 0, 0, false, 10);

        assert!(approx_eq(a, b));
        assert!(approx_le(b, a));
        assert!(approx_ge(a, b));
        assert!(!approx_zero(a));
        assert!(approx_zero(Decimal::ZERO));
    }
}
