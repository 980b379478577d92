use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::Serialize;
use std::fmt;

/// 金额保留两位小数 (四舍五入, 远离零)
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.round(2).with_scale(2)
}

/// 置信度保留两位小数, 并限制在 [0, 1]
pub fn round_confidence(score: f64) -> f64 {
    ((score * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

/// 分值最多 18 位 (整数部分 16 位), 保证落在 i64 内
const MAX_CENT_DIGITS: i64 = 18;

/// 金额分桶键: 两位小数舍入后的整数分值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AmountKey(i64);

impl AmountKey {
    /// 整数部分超过 16 位的金额没有分桶键
    ///
    /// 先按位数和指数判断量级, 再做舍入, 避免对 `1e20000000` 这类输入展开大整数。
    pub fn from_amount(amount: &BigDecimal) -> Option<Self> {
        if amount.is_zero() {
            return Some(Self(0));
        }
        let (_, scale) = amount.as_bigint_and_exponent();
        let int_digits = amount.digits() as i64 - scale;
        if int_digits + 2 > MAX_CENT_DIGITS {
            return None;
        }
        // |amount| < 0.001, 舍入后为 0
        if int_digits < -2 {
            return Some(Self(0));
        }
        let (cents, _) = round_money(amount).as_bigint_and_exponent();
        cents.to_i64().map(Self)
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AmountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn key_ignores_trailing_precision() {
        assert_eq!(AmountKey::from_amount(&dec("100")), AmountKey::from_amount(&dec("100.00")));
        assert_eq!(AmountKey::from_amount(&dec("100.004")), AmountKey::from_amount(&dec("100.00")));
        assert_eq!(AmountKey::from_amount(&dec("99.996")).map(AmountKey::cents), Some(10000));
    }

    #[test]
    fn key_keeps_sign() {
        let debit = AmountKey::from_amount(&dec("-100.00")).unwrap();
        let credit = AmountKey::from_amount(&dec("100.00")).unwrap();
        assert_ne!(debit, credit);
        assert_eq!(debit.to_string(), "-100.00");
        assert_eq!(credit.to_string(), "100.00");
    }

    #[test]
    fn key_display_pads_cents() {
        assert_eq!(AmountKey::from_amount(&dec("7.5")).unwrap().to_string(), "7.50");
        assert_eq!(AmountKey::from_amount(&dec("0.01")).unwrap().to_string(), "0.01");
    }

    #[test]
    fn key_covers_sixteen_integer_digits() {
        let largest = AmountKey::from_amount(&dec("9999999999999999.99")).unwrap();
        assert_eq!(largest.cents(), 999_999_999_999_999_999);
        let smallest = AmountKey::from_amount(&dec("-9999999999999999.99")).unwrap();
        assert_eq!(smallest.cents(), -999_999_999_999_999_999);
        assert_eq!(AmountKey::from_amount(&dec("100000000000000000000")), None);
        assert_eq!(AmountKey::from_amount(&dec("10000000000000000")), None);
    }

    #[test]
    fn huge_exponents_are_rejected_without_expansion() {
        assert_eq!(AmountKey::from_amount(&dec("1e20000000")), None);
        assert_eq!(AmountKey::from_amount(&dec("-1e20000000")), None);
        assert_eq!(AmountKey::from_amount(&dec("1e-20000000")).map(AmountKey::cents), Some(0));
        assert_eq!(AmountKey::from_amount(&dec("0e500")).map(AmountKey::cents), Some(0));
    }

    #[test]
    fn tiny_amounts_round_to_nearest_cent() {
        assert_eq!(AmountKey::from_amount(&dec("0.0004")).map(AmountKey::cents), Some(0));
        assert_eq!(AmountKey::from_amount(&dec("0.006")).map(AmountKey::cents), Some(1));
    }

    #[test]
    fn confidence_rounding_is_bounded() {
        assert_eq!(round_confidence(0.6), 0.6);
        assert_eq!(round_confidence(0.6 + 0.4), 1.0);
        assert_eq!(round_confidence(0.666), 0.67);
        assert_eq!(round_confidence(1.2), 1.0);
        assert_eq!(round_confidence(-0.1), 0.0);
    }
}
