//! SQLite mirror of the pipeline: canonical tables are bulk-loaded into a
//! relational schema and the four KPIs are computed in SQL. Must stay
//! row-for-row equivalent with the in-memory backend; the contract tests in
//! `tests/source_equivalence_test.rs` hold both to that.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::domain::{
    Customer, MonthlyTrendRow, Order, RegionalRevenueRow, RepeatCustomerRow, TopSpenderRow,
};
use crate::error::{PipelineError, Result};
use crate::kpi::SPEND_WINDOW_DAYS;
use crate::source::KpiSource;

const SCHEMA: &str = "
DROP TABLE IF EXISTS orders;
DROP TABLE IF EXISTS customers;

CREATE TABLE customers (
    customer_id     TEXT,
    customer_name   TEXT NOT NULL,
    mobile_number   TEXT PRIMARY KEY,
    region          TEXT NOT NULL
);

CREATE TABLE orders (
    order_id              TEXT PRIMARY KEY,
    mobile_number         TEXT NOT NULL,
    -- UTC instant as unix microseconds; integer comparison is exact.
    order_date_time       INTEGER NOT NULL,
    -- Wall-clock rendering in the business zone, used for month bucketing.
    order_date_time_local TEXT NOT NULL,
    sku_id                TEXT,
    sku_count             INTEGER NOT NULL,
    total_amount          REAL NOT NULL
);

CREATE INDEX idx_orders_mobile ON orders (mobile_number);
";

/// SQLite-backed KPI source. Each run recreates the schema and mirrors the
/// canonical tables, so the database always reflects exactly one run.
pub struct SqliteSource {
    conn: Connection,
    zone: Tz,
}

impl SqliteSource {
    pub fn open(path: &Path, zone: Tz) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening SQLite database at {}", path.display());
        Ok(Self { conn: Connection::open(path)?, zone })
    }

    /// Private database for tests and the contract suite.
    pub fn open_in_memory(zone: Tz) -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()?, zone })
    }

    /// Recreate the schema and mirror the canonical tables in one
    /// transaction. The transaction commits before this returns; any failure
    /// rolls back and the connection itself closes when the source drops.
    pub fn load(&mut self, customers: &[Customer], orders: &[Order]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO customers (customer_id, customer_name, mobile_number, region)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for c in customers {
                insert.execute(params![c.customer_id, c.customer_name, c.mobile_number, c.region])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO orders (order_id, mobile_number, order_date_time,
                                     order_date_time_local, sku_id, sku_count, total_amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for o in orders {
                let local = o.order_date_time.with_timezone(&self.zone);
                insert.execute(params![
                    o.order_id,
                    o.mobile_number,
                    o.order_date_time.timestamp_micros(),
                    local.format("%Y-%m-%d %H:%M:%S").to_string(),
                    o.sku_id,
                    o.sku_count,
                    o.total_amount,
                ])?;
            }
        }

        tx.commit()?;
        info!("Mirrored {} customers and {} orders into SQLite", customers.len(), orders.len());
        Ok(())
    }

    fn max_order_instant(&self) -> Result<Option<DateTime<Utc>>> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(order_date_time) FROM orders", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
        match max {
            Some(micros) => DateTime::from_timestamp_micros(micros)
                .map(Some)
                .ok_or_else(|| PipelineError::Config(format!("timestamp out of range: {micros}"))),
            None => Ok(None),
        }
    }
}

impl KpiSource for SqliteSource {
    fn repeat_customers(&self) -> Result<Vec<RepeatCustomerRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.mobile_number,
                    COUNT(DISTINCT o.order_id) AS order_count,
                    c.customer_id, c.customer_name, c.region
             FROM orders o
             LEFT JOIN customers c ON c.mobile_number = o.mobile_number
             GROUP BY o.mobile_number
             HAVING COUNT(DISTINCT o.order_id) > 1
             ORDER BY order_count DESC, o.mobile_number ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RepeatCustomerRow {
                    mobile_number: row.get(0)?,
                    order_count: row.get::<_, i64>(1)? as u64,
                    customer_id: row.get(2)?,
                    customer_name: row.get(3)?,
                    region: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn monthly_trends(&self) -> Result<Vec<MonthlyTrendRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT strftime('%Y-%m-01', order_date_time_local) AS order_month,
                    COUNT(DISTINCT order_id) AS order_count
             FROM orders
             GROUP BY order_month
             ORDER BY order_month ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(month, order_count)| {
                let order_month = NaiveDate::parse_from_str(&month, "%Y-%m-%d")
                    .map_err(|e| PipelineError::Config(format!("bad month '{month}': {e}")))?;
                Ok(MonthlyTrendRow { order_month, order_count })
            })
            .collect()
    }

    fn regional_revenue(&self) -> Result<Vec<RegionalRevenueRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(c.region, 'Unknown') AS region,
                    SUM(o.total_amount) AS revenue
             FROM orders o
             LEFT JOIN customers c ON c.mobile_number = o.mobile_number
             GROUP BY region
             ORDER BY revenue DESC, region ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RegionalRevenueRow { region: row.get(0)?, revenue: row.get(1)? })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn top_spenders(&self, top_n: usize) -> Result<Vec<TopSpenderRow>> {
        // The cutoff is zone arithmetic, so it happens in Rust with the same
        // chrono-tz math as the in-memory backend and binds as a parameter.
        let Some(now) = self.max_order_instant()? else {
            return Ok(Vec::new());
        };
        let cutoff =
            (now.with_timezone(&self.zone) - Duration::days(SPEND_WINDOW_DAYS)).with_timezone(&Utc);

        let mut stmt = self.conn.prepare(
            "SELECT o.mobile_number,
                    SUM(o.total_amount) AS total_spend,
                    c.customer_id, c.customer_name, c.region
             FROM orders o
             LEFT JOIN customers c ON c.mobile_number = o.mobile_number
             WHERE o.order_date_time >= ?1
             GROUP BY o.mobile_number
             ORDER BY total_spend DESC, o.mobile_number ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![cutoff.timestamp_micros(), top_n as i64], |row| {
                Ok(TopSpenderRow {
                    mobile_number: row.get(0)?,
                    total_spend: row.get(1)?,
                    customer_id: row.get(2)?,
                    customer_name: row.get(3)?,
                    region: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
