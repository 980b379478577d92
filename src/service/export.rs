use std::io::Write;

use crate::models::Match;

const HEADER: [&str; 6] = [
    "id",
    "invoice_number",
    "bank_transaction_id",
    "confidence",
    "reason",
    "matched_at",
];

/// 导出匹配结果到 CSV
pub fn write_matches_csv<W: Write>(matches: &[Match], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    for m in matches {
        writer.write_record(&[
            m.id.clone(),
            m.proposal.invoice_number.clone(),
            m.proposal.bank_transaction_id.clone(),
            format!("{:.2}", m.proposal.confidence),
            m.proposal.reason.clone().unwrap_or_default(),
            m.matched_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchProposal;
    use chrono::{TimeZone, Utc};

    #[test]
    fn writes_header_and_quotes_reasons() {
        let matches = vec![
            Match {
                id: "1".to_string(),
                proposal: MatchProposal {
                    invoice_number: "INV-1".to_string(),
                    bank_transaction_id: "9".to_string(),
                    confidence: 1.0,
                    reason: Some("Amount matches and dates within 2 days".to_string()),
                },
                matched_at: Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(),
            },
            Match {
                id: "2".to_string(),
                proposal: MatchProposal {
                    invoice_number: "INV-2, rev".to_string(),
                    bank_transaction_id: "10".to_string(),
                    confidence: 0.6,
                    reason: None,
                },
                matched_at: Utc.with_ymd_and_hms(2024, 1, 6, 8, 30, 0).unwrap(),
            },
        ];

        let mut buf = Vec::new();
        write_matches_csv(&matches, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,invoice_number,bank_transaction_id,confidence,reason,matched_at");
        assert_eq!(
            lines[1],
            "1,INV-1,9,1.00,Amount matches and dates within 2 days,2024-01-05T12:00:00+00:00"
        );
        assert_eq!(lines[2], "2,\"INV-2, rev\",10,0.60,,2024-01-06T08:30:00+00:00");
    }
}
