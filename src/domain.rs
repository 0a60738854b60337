use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A customer row exactly as read from the source file: all text, untrimmed,
/// nothing validated yet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCustomer {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub region: String,
}

/// An order record as read from the source document. Fields absent from a
/// record are `None`; present-but-empty fields are `Some("")`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub mobile_number: Option<String>,
    pub order_date_time: Option<String>,
    pub sku_id: Option<String>,
    pub sku_count: Option<String>,
    pub total_amount: Option<String>,
}

/// Canonical customer: unique `mobile_number`, title-cased non-empty region,
/// `customer_name` defaulted when the source left it blank.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub mobile_number: String,
    pub region: String,
}

/// Canonical order: unique `order_id`, non-empty join key, and a timestamp
/// normalized to UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub mobile_number: String,
    pub order_date_time: DateTime<Utc>,
    pub sku_id: Option<String>,
    pub sku_count: i64,
    pub total_amount: f64,
}

/// Data-quality findings raised while cleaning. These are surfaced in the run
/// log; they never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanWarning {
    /// Customers sharing a mobile_number; later occurrences were discarded.
    DuplicateCustomers { dropped: usize },
    /// Orders sharing an order_id; later occurrences were discarded.
    DuplicateOrders { dropped: usize },
    /// Orders missing order_id, mobile_number or a parseable timestamp.
    InvalidOrders { dropped: usize },
}

impl std::fmt::Display for CleanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanWarning::DuplicateCustomers { dropped } => {
                write!(f, "duplicate mobile_number in customers; dropped {dropped} later occurrence(s)")
            }
            CleanWarning::DuplicateOrders { dropped } => {
                write!(f, "duplicate order_id in orders; dropped {dropped} later occurrence(s)")
            }
            CleanWarning::InvalidOrders { dropped } => {
                write!(f, "dropped {dropped} order(s) with missing id/mobile/timestamp")
            }
        }
    }
}

/// Repeat-customers KPI row: customers with more than one distinct order.
/// Customer attributes stay `None` when the mobile number has no customer row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatCustomerRow {
    pub mobile_number: String,
    pub order_count: u64,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub region: Option<String>,
}

/// Monthly-trends KPI row: distinct orders per local calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrendRow {
    /// First day of the month, in the configured business zone.
    pub order_month: NaiveDate,
    pub order_count: u64,
}

/// Regional-revenue KPI row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalRevenueRow {
    pub region: String,
    pub revenue: f64,
}

/// Top-spenders KPI row: spend over the trailing 30 days of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSpenderRow {
    pub mobile_number: String,
    pub total_spend: f64,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub region: Option<String>,
}
