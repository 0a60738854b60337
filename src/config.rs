use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::{PipelineError, Result};

/// Runtime configuration, sourced from environment variables (with `.env`
/// support) and falling back to defaults that mirror the repo layout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Customer source: delimited file with columns
    /// customer_id, customer_name, mobile_number, region.
    pub customers_csv: PathBuf,
    /// Order source: XML document with repeated <order> elements.
    pub orders_xml: PathBuf,
    /// Directory the four KPI report artifacts are written to.
    pub reports_dir: PathBuf,
    /// IANA zone used for business-calendar bucketing and naive timestamps.
    pub zone: Tz,
    /// Row cap for the top-spenders KPI.
    pub top_n: usize,
    /// SQLite file backing the relational pipeline variant.
    pub db_path: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Best-effort .env loading; absence is not an error.
        dotenv::dotenv().ok();

        let zone_name = var_or("TZ_NAME", "Asia/Kolkata");
        let zone: Tz = zone_name
            .parse()
            .map_err(|_| PipelineError::Config(format!("unknown IANA time zone '{zone_name}'")))?;

        let top_n_raw = var_or("TOP_N", "10");
        let top_n: usize = top_n_raw
            .parse()
            .map_err(|_| PipelineError::Config(format!("TOP_N must be a number, got '{top_n_raw}'")))?;

        Ok(Config {
            customers_csv: var_or("CUSTOMERS_CSV", "data/raw/customers.csv").into(),
            orders_xml: var_or("ORDERS_XML", "data/raw/orders.xml").into(),
            reports_dir: var_or("REPORTS_DIR", "output").into(),
            zone,
            top_n,
            db_path: var_or("DB_PATH", "data/kpi.db").into(),
        })
    }
}
