//! The four KPI computations, as pure functions over canonical tables.
//!
//! Ordering is fully deterministic: every sort carries a tie-break key so the
//! SQL-backed variant can reproduce results row for row.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Duration, Utc};
use chrono_tz::Tz;

use crate::domain::{
    Customer, MonthlyTrendRow, Order, RegionalRevenueRow, RepeatCustomerRow, TopSpenderRow,
};

/// Days covered by the top-spenders window.
pub const SPEND_WINDOW_DAYS: i64 = 30;

fn customer_index(customers: &[Customer]) -> HashMap<&str, &Customer> {
    customers.iter().map(|c| (c.mobile_number.as_str(), c)).collect()
}

/// Customers with more than one distinct order, most orders first, mobile
/// number as the tie-break. Mobile numbers without a customer row keep `None`
/// attributes rather than being dropped.
pub fn repeat_customers(orders: &[Order], customers: &[Customer]) -> Vec<RepeatCustomerRow> {
    let mut per_mobile: HashMap<&str, HashSet<&str>> = HashMap::new();
    for order in orders {
        per_mobile
            .entry(order.mobile_number.as_str())
            .or_default()
            .insert(order.order_id.as_str());
    }

    let index = customer_index(customers);
    let mut rows: Vec<RepeatCustomerRow> = per_mobile
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(mobile, ids)| {
            let customer = index.get(mobile);
            RepeatCustomerRow {
                mobile_number: mobile.to_string(),
                order_count: ids.len() as u64,
                customer_id: customer.and_then(|c| c.customer_id.clone()),
                customer_name: customer.map(|c| c.customer_name.clone()),
                region: customer.map(|c| c.region.clone()),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.order_count
            .cmp(&a.order_count)
            .then_with(|| a.mobile_number.cmp(&b.mobile_number))
    });
    rows
}

/// Distinct orders per calendar month, ascending. Months are bucketed in the
/// business zone, not UTC, to match local reporting conventions.
pub fn monthly_trends(orders: &[Order], zone: Tz) -> Vec<MonthlyTrendRow> {
    let mut per_month: BTreeMap<chrono::NaiveDate, HashSet<&str>> = BTreeMap::new();
    for order in orders {
        let local = order.order_date_time.with_timezone(&zone);
        let month = local.date_naive().with_day(1).unwrap_or_else(|| local.date_naive());
        per_month.entry(month).or_default().insert(order.order_id.as_str());
    }

    per_month
        .into_iter()
        .map(|(order_month, ids)| MonthlyTrendRow { order_month, order_count: ids.len() as u64 })
        .collect()
}

/// Revenue per region, highest first, region name as the tie-break. Orders
/// whose mobile number has no customer row land in "Unknown".
pub fn regional_revenue(orders: &[Order], customers: &[Customer]) -> Vec<RegionalRevenueRow> {
    let index = customer_index(customers);
    let mut per_region: HashMap<String, f64> = HashMap::new();
    for order in orders {
        let region = index
            .get(order.mobile_number.as_str())
            .map(|c| c.region.clone())
            .unwrap_or_else(|| crate::cleaner::UNKNOWN.to_string());
        *per_region.entry(region).or_insert(0.0) += order.total_amount;
    }

    let mut rows: Vec<RegionalRevenueRow> = per_region
        .into_iter()
        .map(|(region, revenue)| RegionalRevenueRow { region, revenue })
        .collect();
    rows.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.region.cmp(&b.region))
    });
    rows
}

/// Spend per mobile number over the trailing 30 days of the dataset, highest
/// first, capped at `top_n`.
///
/// "Now" is the maximum order timestamp, not the wall clock, so results are
/// reproducible over static data. The cutoff is computed in the business zone
/// and compared as an instant.
pub fn top_spenders(
    orders: &[Order],
    customers: &[Customer],
    zone: Tz,
    top_n: usize,
) -> Vec<TopSpenderRow> {
    let Some(now) = orders.iter().map(|o| o.order_date_time).max() else {
        return Vec::new();
    };
    let cutoff = (now.with_timezone(&zone) - Duration::days(SPEND_WINDOW_DAYS)).with_timezone(&Utc);

    let mut per_mobile: HashMap<&str, f64> = HashMap::new();
    for order in orders.iter().filter(|o| o.order_date_time >= cutoff) {
        *per_mobile.entry(order.mobile_number.as_str()).or_insert(0.0) += order.total_amount;
    }

    let index = customer_index(customers);
    let mut rows: Vec<TopSpenderRow> = per_mobile
        .into_iter()
        .map(|(mobile, total_spend)| {
            let customer = index.get(mobile);
            TopSpenderRow {
                mobile_number: mobile.to_string(),
                total_spend,
                customer_id: customer.and_then(|c| c.customer_id.clone()),
                customer_name: customer.map(|c| c.customer_name.clone()),
                region: customer.map(|c| c.region.clone()),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_spend
            .total_cmp(&a.total_spend)
            .then_with(|| a.mobile_number.cmp(&b.mobile_number))
    });
    rows.truncate(top_n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn kolkata() -> Tz {
        "Asia/Kolkata".parse().unwrap()
    }

    fn order(id: &str, mobile: &str, ts: &str, amount: f64) -> Order {
        Order {
            order_id: id.to_string(),
            mobile_number: mobile.to_string(),
            order_date_time: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            sku_id: None,
            sku_count: 1,
            total_amount: amount,
        }
    }

    fn customer(id: &str, name: &str, mobile: &str, region: &str) -> Customer {
        Customer {
            customer_id: Some(id.to_string()),
            customer_name: name.to_string(),
            mobile_number: mobile.to_string(),
            region: region.to_string(),
        }
    }

    #[test]
    fn three_orders_one_mobile_count_three() {
        let orders = vec![
            order("O1", "91000000001", "2024-01-01T05:00:00Z", 10.0),
            order("O2", "91000000001", "2024-01-02T05:00:00Z", 10.0),
            order("O3", "91000000001", "2024-01-03T05:00:00Z", 10.0),
            order("O4", "91000000002", "2024-01-03T05:00:00Z", 10.0),
        ];
        let customers = vec![customer("C1", "Asha", "91000000001", "North")];
        let rows = repeat_customers(&orders, &customers);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mobile_number, "91000000001");
        assert_eq!(rows[0].order_count, 3);
        assert_eq!(rows[0].customer_name.as_deref(), Some("Asha"));
    }

    #[test]
    fn repeat_customers_never_contains_single_orders() {
        let orders = vec![
            order("O1", "91", "2024-01-01T00:00:00Z", 1.0),
            order("O2", "92", "2024-01-01T00:00:00Z", 1.0),
        ];
        assert!(repeat_customers(&orders, &[]).is_empty());
    }

    #[test]
    fn repeat_customers_tie_breaks_on_mobile() {
        let orders = vec![
            order("A1", "92", "2024-01-01T00:00:00Z", 1.0),
            order("A2", "92", "2024-01-02T00:00:00Z", 1.0),
            order("B1", "91", "2024-01-01T00:00:00Z", 1.0),
            order("B2", "91", "2024-01-02T00:00:00Z", 1.0),
        ];
        let rows = repeat_customers(&orders, &[]);
        assert_eq!(rows[0].mobile_number, "91");
        assert_eq!(rows[1].mobile_number, "92");
        assert_eq!(rows[0].region, None);
    }

    #[test]
    fn monthly_trends_buckets_in_local_time() {
        // 2024-01-31T20:00Z is already 2024-02-01 01:30 in Kolkata.
        let orders = vec![
            order("O1", "91", "2024-01-31T20:00:00Z", 1.0),
            order("O2", "91", "2024-01-15T05:00:00Z", 1.0),
        ];
        let rows = monthly_trends(&orders, kolkata());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order_month, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(rows[0].order_count, 1);
        assert_eq!(rows[1].order_month, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn regional_revenue_conserves_total_and_defaults_unknown() {
        let orders = vec![
            order("O1", "91", "2024-01-01T00:00:00Z", 100.0),
            order("O2", "92", "2024-01-01T00:00:00Z", 50.0),
            order("O3", "93", "2024-01-01T00:00:00Z", 25.0),
        ];
        let customers = vec![
            customer("C1", "Asha", "91", "North"),
            customer("C2", "Bina", "92", "South"),
        ];
        let rows = regional_revenue(&orders, &customers);
        let total: f64 = rows.iter().map(|r| r.revenue).sum();
        let order_total: f64 = orders.iter().map(|o| o.total_amount).sum();
        assert_eq!(total, order_total);
        assert!(rows.iter().any(|r| r.region == "Unknown" && r.revenue == 25.0));
        assert_eq!(rows[0].region, "North");
    }

    #[test]
    fn top_spenders_caps_and_orders() {
        let orders = vec![
            order("O1", "91", "2024-03-20T00:00:00Z", 100.0),
            order("O2", "92", "2024-03-21T00:00:00Z", 80.0),
            order("O3", "93", "2024-03-22T00:00:00Z", 50.0),
        ];
        let rows = top_spenders(&orders, &[], kolkata(), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_spend, 100.0);
        assert_eq!(rows[1].total_spend, 80.0);
    }

    #[test]
    fn top_spenders_window_is_relative_to_dataset_max() {
        let orders = vec![
            // 40 days before the max; outside the window.
            order("O1", "91", "2024-02-11T00:00:00Z", 500.0),
            order("O2", "92", "2024-03-22T00:00:00Z", 50.0),
        ];
        let rows = top_spenders(&orders, &[], kolkata(), 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mobile_number, "92");
    }

    #[test]
    fn top_spenders_empty_orders_is_empty_not_error() {
        assert!(top_spenders(&[], &[], kolkata(), 10).is_empty());
    }
}
