use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::source::KpiSet;

const REPEAT_HEADERS: [&str; 5] =
    ["mobile_number", "order_count", "customer_id", "customer_name", "region"];
const MONTHLY_HEADERS: [&str; 2] = ["order_month", "order_count"];
const REGIONAL_HEADERS: [&str; 2] = ["region", "revenue"];
const SPENDER_HEADERS: [&str; 5] =
    ["mobile_number", "total_spend", "customer_id", "customer_name", "region"];

/// Writes one CSV artifact per KPI into the configured reports directory.
/// The sink never mutates results; reports are written only after the whole
/// KPI set has been computed, so a failed run leaves no partial output.
pub struct ReportSink {
    dir: PathBuf,
    prefix: String,
}

impl ReportSink {
    /// `prefix` distinguishes the two variants: `kpi` for the in-memory run,
    /// `db` for the relational run.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self { dir: dir.to_path_buf(), prefix: prefix.to_string() }
    }

    pub fn write_all(&self, kpis: &KpiSet) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write(&kpis.repeat_customers, "repeat_customers", &REPEAT_HEADERS)?;
        self.write(&kpis.monthly_trends, "monthly_trends", &MONTHLY_HEADERS)?;
        self.write(&kpis.regional_revenue, "regional_revenue", &REGIONAL_HEADERS)?;
        self.write(&kpis.top_spenders, "top_spenders_last_30_days", &SPENDER_HEADERS)?;
        Ok(())
    }

    fn write<T: Serialize>(&self, rows: &[T], name: &str, headers: &[&str]) -> Result<()> {
        let path = self.dir.join(format!("{}_{name}.csv", self.prefix));
        let mut writer = csv::Writer::from_path(&path)?;
        if rows.is_empty() {
            // serde-derived headers only appear with the first record; an
            // empty result still needs the full column set.
            writer.write_record(headers)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Saved report: {}", path.display());
        Ok(())
    }
}

/// Human-readable console rendering of all four KPI tables.
pub fn print_summary(kpis: &KpiSet, title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{title}");
    println!("{}", "=".repeat(80));

    println!("\n--- Repeat Customers ---");
    print!(
        "{}",
        format_table(
            &REPEAT_HEADERS,
            kpis.repeat_customers
                .iter()
                .map(|r| vec![
                    r.mobile_number.clone(),
                    r.order_count.to_string(),
                    opt(&r.customer_id),
                    opt(&r.customer_name),
                    opt(&r.region),
                ])
                .collect(),
        )
    );

    println!("\n--- Monthly Order Trends ---");
    print!(
        "{}",
        format_table(
            &MONTHLY_HEADERS,
            kpis.monthly_trends
                .iter()
                .map(|r| vec![r.order_month.to_string(), r.order_count.to_string()])
                .collect(),
        )
    );

    println!("\n--- Regional Revenue ---");
    print!(
        "{}",
        format_table(
            &REGIONAL_HEADERS,
            kpis.regional_revenue
                .iter()
                .map(|r| vec![r.region.clone(), format!("{:.2}", r.revenue)])
                .collect(),
        )
    );

    println!("\n--- Top Spenders (Last 30 Days) ---");
    print!(
        "{}",
        format_table(
            &SPENDER_HEADERS,
            kpis.top_spenders
                .iter()
                .map(|r| vec![
                    r.mobile_number.clone(),
                    format!("{:.2}", r.total_spend),
                    opt(&r.customer_id),
                    opt(&r.customer_name),
                    opt(&r.region),
                ])
                .collect(),
        )
    );

    println!("\n{}", "=".repeat(80));
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Left-aligned fixed-width table. Empty tables render as headers plus a
/// placeholder line.
fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", header, width = widths[i]));
    }
    out.push('\n');

    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
        out.push('\n');
    }
    out
}
