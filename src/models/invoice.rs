use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::amount::AmountKey;
use super::date::lenient_date;
use crate::error::ValidationError;

pub const DEFAULT_CURRENCY: &str = "USD";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_tax() -> Option<BigDecimal> {
    Some(BigDecimal::zero())
}

fn default_quantity() -> BigDecimal {
    BigDecimal::from(1)
}

/// 发票明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    #[serde(default)]
    pub total: Option<BigDecimal>,
}

impl InvoiceLine {
    /// 行金额: 优先使用记录值, 否则为 数量 × 单价
    pub fn computed_total(&self) -> BigDecimal {
        self.total
            .clone()
            .unwrap_or_else(|| &self.quantity * &self.unit_price)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity < BigDecimal::zero() {
            return Err(ValidationError::new("lines.quantity", "must be >= 0"));
        }
        if self.unit_price < BigDecimal::zero() {
            return Err(ValidationError::new("lines.unit_price", "must be >= 0"));
        }
        Ok(())
    }
}

/// 供应商发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_email: Option<String>,
    /// 提交时必填; 已存储记录中缺失或无法解析时为 None
    #[serde(default, deserialize_with = "lenient_date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub subtotal: Option<BigDecimal>,
    #[serde(default = "default_tax")]
    pub tax: Option<BigDecimal>,
    pub total: BigDecimal,
    #[serde(default)]
    pub lines: Option<Vec<InvoiceLine>>,
}

impl Invoice {
    pub fn new(
        invoice_number: impl Into<String>,
        vendor_name: impl Into<String>,
        total: BigDecimal,
    ) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            vendor_name: vendor_name.into(),
            vendor_email: None,
            invoice_date: None,
            due_date: None,
            currency: default_currency(),
            subtotal: None,
            tax: default_tax(),
            total,
            lines: None,
        }
    }

    pub fn with_invoice_date(mut self, date: NaiveDate) -> Self {
        self.invoice_date = Some(date);
        self
    }

    /// 边界校验: 必填字段与取值范围
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.invoice_number.trim().is_empty() {
            return Err(ValidationError::new("invoice_number", "must not be empty"));
        }
        if self.vendor_name.trim().is_empty() {
            return Err(ValidationError::new("vendor_name", "must not be empty"));
        }
        if let Some(email) = &self.vendor_email {
            if !looks_like_email(email) {
                return Err(ValidationError::new(
                    "vendor_email",
                    format!("'{}' is not a valid email address", email),
                ));
            }
        }
        if self.invoice_date.is_none() {
            return Err(ValidationError::new("invoice_date", "required, expected YYYY-MM-DD"));
        }
        validate_currency(&self.currency)?;
        non_negative("subtotal", self.subtotal.as_ref())?;
        non_negative("tax", self.tax.as_ref())?;
        non_negative("total", Some(&self.total))?;
        within_key_range("total", &self.total)?;
        for line in self.lines.iter().flatten() {
            line.validate()?;
        }
        Ok(())
    }

    /// 为缺少金额的明细行补上计算值
    pub fn fill_line_totals(&mut self) {
        for line in self.lines.iter_mut().flatten() {
            if line.total.is_none() {
                line.total = Some(line.computed_total());
            }
        }
    }
}

pub(crate) fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(
            "currency",
            format!("'{}' is not a 3-letter code", currency),
        ));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: Option<&BigDecimal>) -> Result<(), ValidationError> {
    match value {
        Some(v) if *v < BigDecimal::zero() => Err(ValidationError::new(field, "must be >= 0")),
        _ => Ok(()),
    }
}

/// 金额必须能构造分桶键, 否则匹配时会被跳过
pub(crate) fn within_key_range(
    field: &'static str,
    amount: &BigDecimal,
) -> Result<(), ValidationError> {
    match AmountKey::from_amount(amount) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new(field, "out of range, at most 16 integer digits")),
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn sample() -> Invoice {
        Invoice::new("INV-1", "Acme Supplies", BigDecimal::from(100))
            .with_invoice_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn deserializes_with_defaults() {
        let invoice: Invoice = serde_json::from_value(json!({
            "invoice_number": "INV-7",
            "vendor_name": "Acme",
            "invoice_date": "2024-03-05",
            "total": 42.5
        }))
        .unwrap();

        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.tax, Some(BigDecimal::zero()));
        assert_eq!(invoice.invoice_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert!(invoice.lines.is_none());
        assert!(invoice.validate().is_ok());
    }

    #[test]
    fn malformed_date_degrades_to_none() {
        let invoice: Invoice = serde_json::from_value(json!({
            "invoice_number": "INV-8",
            "vendor_name": "Acme",
            "invoice_date": "yesterday",
            "total": "10.00"
        }))
        .unwrap();

        assert_eq!(invoice.invoice_date, None);
        assert_eq!(invoice.validate().unwrap_err().field, "invoice_date");
    }

    #[test]
    fn rejects_negative_amounts() {
        let mut invoice = sample();
        invoice.total = BigDecimal::from(-1);
        assert_eq!(invoice.validate().unwrap_err().field, "total");

        let mut invoice = sample();
        invoice.tax = Some(BigDecimal::from(-3));
        assert_eq!(invoice.validate().unwrap_err().field, "tax");
    }

    #[test]
    fn rejects_totals_without_amount_key() {
        let mut invoice = sample();
        invoice.total = BigDecimal::from_str("100000000000000000000").unwrap();
        assert_eq!(invoice.validate().unwrap_err().field, "total");

        let mut invoice = sample();
        invoice.total = BigDecimal::from_str("1e20000000").unwrap();
        let err = invoice.validate().unwrap_err();
        assert_eq!(err.field, "total");
        assert!(err.message.contains("16 integer digits"));

        let mut invoice = sample();
        invoice.total = BigDecimal::from_str("9999999999999999.99").unwrap();
        assert!(invoice.validate().is_ok());
    }

    #[test]
    fn rejects_bad_currency_and_email() {
        let mut invoice = sample();
        invoice.currency = "EURO".to_string();
        assert_eq!(invoice.validate().unwrap_err().field, "currency");

        let mut invoice = sample();
        invoice.vendor_email = Some("billing.acme.com".to_string());
        assert_eq!(invoice.validate().unwrap_err().field, "vendor_email");

        let mut invoice = sample();
        invoice.vendor_email = Some("billing@acme.com".to_string());
        assert!(invoice.validate().is_ok());
    }

    #[test]
    fn line_totals_are_computed_when_missing() {
        let mut invoice = sample();
        invoice.lines = Some(vec![
            InvoiceLine {
                description: "Paper".to_string(),
                quantity: BigDecimal::from(4),
                unit_price: BigDecimal::from(5),
                total: None,
            },
            InvoiceLine {
                description: "Toner".to_string(),
                quantity: BigDecimal::from(1),
                unit_price: BigDecimal::from(80),
                total: Some(BigDecimal::from(75)),
            },
        ]);

        invoice.fill_line_totals();
        let lines = invoice.lines.unwrap();
        assert_eq!(lines[0].total, Some(BigDecimal::from(20)));
        assert_eq!(lines[1].total, Some(BigDecimal::from(75)));
    }

    #[test]
    fn rejects_negative_line_price() {
        let mut invoice = sample();
        invoice.lines = Some(vec![InvoiceLine {
            description: "Refund".to_string(),
            quantity: BigDecimal::from(1),
            unit_price: BigDecimal::from(-5),
            total: None,
        }]);
        assert_eq!(invoice.validate().unwrap_err().field, "lines.unit_price");
    }
}
