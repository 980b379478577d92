use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date::lenient_date;
use super::invoice::{validate_currency, within_key_range, DEFAULT_CURRENCY};
use crate::error::ValidationError;

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// 银行流水 (正数=入账, 负数=出账)
///
/// 不做业务键去重: 重复流水合法, 各自独立参与匹配。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    #[serde(default)]
    pub bank_ref: Option<String>,
    pub description: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    pub amount: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl BankTransaction {
    pub fn new(description: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            bank_ref: None,
            description: description.into(),
            date: None,
            amount,
            currency: default_currency(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::new("description", "must not be empty"));
        }
        if self.date.is_none() {
            return Err(ValidationError::new("date", "required, expected YYYY-MM-DD"));
        }
        within_key_range("amount", &self.amount)?;
        validate_currency(&self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn accepts_signed_amounts() {
        let txn: BankTransaction = serde_json::from_value(json!({
            "description": "Card payment ACME",
            "date": "2024-01-03",
            "amount": -100.0
        }))
        .unwrap();

        assert_eq!(txn.amount, BigDecimal::from(-100));
        assert_eq!(txn.currency, "USD");
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn rejects_amounts_without_amount_key() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        for raw in ["100000000000000000000", "-1e20000000"] {
            let amount = BigDecimal::from_str(raw).unwrap();
            let txn = BankTransaction::new("Wire", amount).with_date(day);
            assert_eq!(txn.validate().unwrap_err().field, "amount");
        }
    }

    #[test]
    fn requires_description_and_date() {
        let txn = BankTransaction::new("  ", BigDecimal::from(5));
        assert_eq!(txn.validate().unwrap_err().field, "description");

        let txn = BankTransaction::new("Wire", BigDecimal::from(5));
        assert_eq!(txn.validate().unwrap_err().field, "date");
    }
}
