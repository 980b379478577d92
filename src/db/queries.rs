use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use super::store::Collection;
use crate::models::{BankTransaction, Invoice, InvoiceLine, Match, MatchProposal, Stored};

/// 发票主表行
#[derive(Debug, Clone, FromRow)]
struct InvoiceRow {
    id: i64,
    invoice_number: String,
    vendor_name: String,
    vendor_email: Option<String>,
    invoice_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    currency: String,
    subtotal: Option<BigDecimal>,
    tax: Option<BigDecimal>,
    total: BigDecimal,
    has_lines: bool,
}

impl InvoiceRow {
    fn into_stored(self, lines: Option<Vec<InvoiceLine>>) -> Stored<Invoice> {
        Stored::new(
            self.id.to_string(),
            Invoice {
                invoice_number: self.invoice_number,
                vendor_name: self.vendor_name,
                vendor_email: self.vendor_email,
                invoice_date: self.invoice_date,
                due_date: self.due_date,
                currency: self.currency,
                subtotal: self.subtotal,
                tax: self.tax,
                total: self.total,
                lines,
            },
        )
    }
}

/// 发票明细行
#[derive(Debug, Clone, FromRow)]
struct InvoiceLineRow {
    invoice_id: i64,
    description: String,
    quantity: BigDecimal,
    unit_price: BigDecimal,
    total: Option<BigDecimal>,
}

#[derive(Debug, Clone, FromRow)]
struct TransactionRow {
    id: i64,
    bank_ref: Option<String>,
    description: String,
    date: Option<NaiveDate>,
    amount: BigDecimal,
    currency: String,
}

#[derive(Debug, Clone, FromRow)]
struct MatchRow {
    id: i64,
    invoice_number: String,
    bank_transaction_id: String,
    confidence: f64,
    reason: Option<String>,
    matched_at: DateTime<Utc>,
}

/// 插入发票及其明细 (同一事务)
pub async fn insert_invoice(pool: &PgPool, invoice: &Invoice) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO invoices (
            invoice_number, vendor_name, vendor_email, invoice_date, due_date,
            currency, subtotal, tax, total, has_lines
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&invoice.invoice_number)
    .bind(&invoice.vendor_name)
    .bind(invoice.vendor_email.as_deref())
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(&invoice.currency)
    .bind(&invoice.subtotal)
    .bind(&invoice.tax)
    .bind(&invoice.total)
    .bind(invoice.lines.is_some())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(lines) = invoice.lines.as_ref().filter(|lines| !lines.is_empty()) {
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO invoice_lines \
             (invoice_id, line_no, description, quantity, unit_price, total) ",
        );
        query_builder.push_values(lines.iter().enumerate(), |mut b, (idx, line)| {
            b.push_bind(id)
                .push_bind(idx as i32)
                .push_bind(&line.description)
                .push_bind(&line.quantity)
                .push_bind(&line.unit_price)
                .push_bind(&line.total);
        });
        query_builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(id)
}

/// 查询发票 (按插入顺序)
pub async fn list_invoices(pool: &PgPool, limit: i64) -> Result<Vec<Stored<Invoice>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, invoice_number, vendor_name, vendor_email, invoice_date, due_date,
               currency, subtotal, tax, total, has_lines
        FROM invoices
        ORDER BY id
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    // 明细按发票ID分块批量加载
    let ids: Vec<i64> = rows.iter().filter(|r| r.has_lines).map(|r| r.id).collect();
    let mut lines_by_invoice: HashMap<i64, Vec<InvoiceLine>> = HashMap::new();
    for chunk in ids.chunks(1000) {
        let line_rows = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT invoice_id, description, quantity, unit_price, total
            FROM invoice_lines
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, line_no
            "#,
        )
        .bind(chunk)
        .fetch_all(pool)
        .await?;

        for lr in line_rows {
            lines_by_invoice.entry(lr.invoice_id).or_default().push(InvoiceLine {
                description: lr.description,
                quantity: lr.quantity,
                unit_price: lr.unit_price,
                total: lr.total,
            });
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let lines = row
                .has_lines
                .then(|| lines_by_invoice.remove(&row.id).unwrap_or_default());
            row.into_stored(lines)
        })
        .collect())
}

pub async fn insert_transaction(pool: &PgPool, txn: &BankTransaction) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO bank_transactions (bank_ref, description, date, amount, currency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(txn.bank_ref.as_deref())
    .bind(&txn.description)
    .bind(txn.date)
    .bind(&txn.amount)
    .bind(&txn.currency)
    .fetch_one(pool)
    .await
}

pub async fn list_transactions(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<Stored<BankTransaction>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT id, bank_ref, description, date, amount, currency
        FROM bank_transactions
        ORDER BY id
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            Stored::new(
                row.id.to_string(),
                BankTransaction {
                    bank_ref: row.bank_ref,
                    description: row.description,
                    date: row.date,
                    amount: row.amount,
                    currency: row.currency,
                },
            )
        })
        .collect())
}

/// 写入匹配结果
pub async fn insert_match(pool: &PgPool, proposal: &MatchProposal) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO matches (invoice_number, bank_transaction_id, confidence, reason)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&proposal.invoice_number)
    .bind(&proposal.bank_transaction_id)
    .bind(proposal.confidence)
    .bind(proposal.reason.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn list_matches(pool: &PgPool, limit: i64) -> Result<Vec<Match>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MatchRow>(
        r#"
        SELECT id, invoice_number, bank_transaction_id, confidence, reason, matched_at
        FROM matches
        ORDER BY id
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Match {
            id: row.id.to_string(),
            proposal: MatchProposal {
                invoice_number: row.invoice_number,
                bank_transaction_id: row.bank_transaction_id,
                confidence: row.confidence,
                reason: row.reason,
            },
            matched_at: row.matched_at,
        })
        .collect())
}

/// 统计集合记录数
pub async fn count_rows(pool: &PgPool, collection: Collection) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT count(*) FROM {}", collection.table());
    sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await
}
