use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 建表语句, 启动时逐条执行 (幂等)
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id             BIGSERIAL PRIMARY KEY,
        invoice_number TEXT NOT NULL,
        vendor_name    TEXT NOT NULL,
        vendor_email   TEXT,
        invoice_date   DATE,
        due_date       DATE,
        currency       VARCHAR(3) NOT NULL,
        subtotal       NUMERIC,
        tax            NUMERIC,
        total          NUMERIC NOT NULL CHECK (total >= 0),
        has_lines      BOOLEAN NOT NULL DEFAULT FALSE,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invoice_lines (
        invoice_id  BIGINT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
        line_no     INTEGER NOT NULL,
        description TEXT NOT NULL,
        quantity    NUMERIC NOT NULL,
        unit_price  NUMERIC NOT NULL,
        total       NUMERIC,
        PRIMARY KEY (invoice_id, line_no)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_transactions (
        id          BIGSERIAL PRIMARY KEY,
        bank_ref    TEXT,
        description TEXT NOT NULL,
        date        DATE,
        amount      NUMERIC NOT NULL,
        currency    VARCHAR(3) NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id                  BIGSERIAL PRIMARY KEY,
        invoice_number      TEXT NOT NULL,
        bank_transaction_id TEXT NOT NULL,
        confidence          DOUBLE PRECISION NOT NULL CHECK (confidence >= 0 AND confidence <= 1),
        reason              TEXT,
        matched_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// 创建数据库连接池
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let mut connect_options = PgConnectOptions::from_str(database_url)?;

    // 设置慢查询日志阈值为 5秒
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
}

/// 初始化表结构
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Database schema ready");
    Ok(())
}
