use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 解析记录日期 (ISO-8601), 无法解析时返回 None
///
/// 接受 `YYYY-MM-DD`, 以及带时间部分的 ISO 日期时间 (取其日期)。
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = raw.parse::<NaiveDateTime>() {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

/// 宽松日期反序列化: 缺失, null, 非字符串或格式错误都视为 None
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => parse_record_date(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_datetime_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 3);
        assert_eq!(parse_record_date("2024-01-03"), expected);
        assert_eq!(parse_record_date(" 2024-01-03 "), expected);
        assert_eq!(parse_record_date("2024-01-03T10:15:00"), expected);
        assert_eq!(parse_record_date("2024-01-03 10:15:00"), expected);
        assert_eq!(parse_record_date("2024-01-03T10:15:00+02:00"), expected);
    }

    #[test]
    fn malformed_dates_are_absent() {
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("not-a-date"), None);
        assert_eq!(parse_record_date("2024-13-40"), None);
        assert_eq!(parse_record_date("03/01/2024"), None);
    }
}
