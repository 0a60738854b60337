use std::collections::HashSet;

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::{CleanWarning, Customer, Order, RawCustomer, RawOrder};

/// Placeholder for missing names and regions.
pub const UNKNOWN: &str = "Unknown";

/// Clean and validate customer rows.
///
/// Coercion policy (the only place defaults are applied):
/// - every field is whitespace-trimmed;
/// - `customer_id`: empty -> None;
/// - `customer_name`: empty -> "Unknown";
/// - `region`: empty -> "Unknown", otherwise title case;
/// - duplicate `mobile_number`: first occurrence wins, warning recorded.
///
/// Idempotent: cleaning an already-clean table yields an identical table.
pub fn clean_customers(raw: Vec<RawCustomer>) -> (Vec<Customer>, Vec<CleanWarning>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut customers = Vec::new();
    let mut duplicates = 0usize;

    for row in raw {
        let mobile_number = row.mobile_number.trim().to_string();
        if !seen.insert(mobile_number.clone()) {
            duplicates += 1;
            continue;
        }

        let customer_id = non_empty(&row.customer_id);
        let customer_name = non_empty(&row.customer_name).unwrap_or_else(|| UNKNOWN.to_string());
        let region = match non_empty(&row.region) {
            Some(region) => title_case(&region),
            None => UNKNOWN.to_string(),
        };

        customers.push(Customer { customer_id, customer_name, mobile_number, region });
    }

    let mut warnings = Vec::new();
    if duplicates > 0 {
        warnings.push(CleanWarning::DuplicateCustomers { dropped: duplicates });
    }
    (customers, warnings)
}

/// Clean and validate order rows.
///
/// Coercion policy:
/// - every field is whitespace-trimmed;
/// - `sku_count`: unparseable -> 0;
/// - `total_amount`: unparseable -> 0.0;
/// - `order_date_time`: normalized to UTC, see [`parse_order_timestamp`];
/// - rows missing `order_id`, `mobile_number` or a parseable timestamp are
///   dropped and counted in one warning;
/// - duplicate `order_id`: first occurrence wins, warning recorded.
pub fn clean_orders(raw: Vec<RawOrder>, zone: Tz) -> (Vec<Order>, Vec<CleanWarning>) {
    let total = raw.len();
    let mut seen: HashSet<String> = HashSet::new();
    let mut orders = Vec::new();
    let mut duplicates = 0usize;

    for row in raw {
        let order_id = row.order_id.as_deref().and_then(non_empty);
        let mobile_number = row.mobile_number.as_deref().and_then(non_empty);
        let order_date_time = row
            .order_date_time
            .as_deref()
            .and_then(|value| parse_order_timestamp(value, zone));

        let (Some(order_id), Some(mobile_number), Some(order_date_time)) =
            (order_id, mobile_number, order_date_time)
        else {
            continue;
        };

        if !seen.insert(order_id.clone()) {
            duplicates += 1;
            continue;
        }

        orders.push(Order {
            order_id,
            mobile_number,
            order_date_time,
            sku_id: row.sku_id.as_deref().and_then(non_empty),
            sku_count: coerce_count(row.sku_count.as_deref()),
            total_amount: coerce_amount(row.total_amount.as_deref()),
        });
    }

    let dropped = total - orders.len() - duplicates;
    let mut warnings = Vec::new();
    if dropped > 0 {
        warnings.push(CleanWarning::InvalidOrders { dropped });
    }
    if duplicates > 0 {
        warnings.push(CleanWarning::DuplicateOrders { dropped: duplicates });
    }
    (orders, warnings)
}

/// Parse an order timestamp and normalize it to UTC.
///
/// Offset-bearing values are converted directly. Naive values are taken as
/// wall-clock time in the configured zone; an ambiguous local time (DST fold)
/// resolves to the earliest offset, and a nonexistent local time (DST gap) is
/// treated as unparseable.
pub fn parse_order_timestamp(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = parse_naive(value)?;
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Some(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    // Date-only values count as midnight.
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Title case: first letter of each word uppercased, the rest lowered.
/// Internal whitespace collapses to single spaces (fields are trimmed anyway).
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn coerce_count(value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim) else { return 0 };
    if let Ok(n) = value.parse::<i64>() {
        return n;
    }
    // Accept float renderings like "3.0"; truncation matches integer storage.
    value.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

fn coerce_amount(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn kolkata() -> Tz {
        "Asia/Kolkata".parse().unwrap()
    }

    fn raw_customer(id: &str, name: &str, mobile: &str, region: &str) -> RawCustomer {
        RawCustomer {
            customer_id: id.to_string(),
            customer_name: name.to_string(),
            mobile_number: mobile.to_string(),
            region: region.to_string(),
        }
    }

    fn raw_order(id: &str, mobile: &str, ts: &str) -> RawOrder {
        RawOrder {
            order_id: Some(id.to_string()),
            mobile_number: Some(mobile.to_string()),
            order_date_time: Some(ts.to_string()),
            sku_id: Some("S1".to_string()),
            sku_count: Some("1".to_string()),
            total_amount: Some("10.0".to_string()),
        }
    }

    #[test]
    fn empty_region_becomes_unknown() {
        let (customers, _) = clean_customers(vec![raw_customer("C1", "Asha", "91", "  ")]);
        assert_eq!(customers[0].region, "Unknown");
    }

    #[test]
    fn region_is_title_cased() {
        let (customers, _) = clean_customers(vec![raw_customer("C1", "Asha", "91", " uttar pradesh ")]);
        assert_eq!(customers[0].region, "Uttar Pradesh");
    }

    #[test]
    fn duplicate_mobile_first_occurrence_wins() {
        let (customers, warnings) = clean_customers(vec![
            raw_customer("C1", "Asha", "91", "north"),
            raw_customer("C2", "Bina", "91", "south"),
        ]);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].customer_id.as_deref(), Some("C1"));
        assert_eq!(warnings, vec![CleanWarning::DuplicateCustomers { dropped: 1 }]);
    }

    #[test]
    fn missing_name_and_id_default() {
        let (customers, _) = clean_customers(vec![raw_customer("", "", "91", "north")]);
        assert_eq!(customers[0].customer_id, None);
        assert_eq!(customers[0].customer_name, "Unknown");
    }

    #[test]
    fn naive_timestamp_is_localized_then_stored_utc() {
        // Kolkata is UTC+05:30 year-round.
        let ts = parse_order_timestamp("2024-01-15 10:30:00", kolkata()).unwrap();
        assert_eq!(ts.hour(), 5);
        assert_eq!(ts.minute(), 0);
    }

    #[test]
    fn offset_bearing_timestamp_is_taken_as_is() {
        let ts = parse_order_timestamp("2024-01-15T10:30:00+00:00", kolkata()).unwrap();
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn ambiguous_local_time_resolves_to_earliest_offset() {
        // US/Eastern 2023-11-05 01:30 happens twice; earliest is EDT (-04:00),
        // i.e. 05:30 UTC.
        let eastern: Tz = "US/Eastern".parse().unwrap();
        let ts = parse_order_timestamp("2023-11-05 01:30:00", eastern).unwrap();
        assert_eq!(ts.hour(), 5);
    }

    #[test]
    fn gap_local_time_is_dropped() {
        // US/Eastern 2023-03-12 02:30 does not exist.
        let eastern: Tz = "US/Eastern".parse().unwrap();
        assert_eq!(parse_order_timestamp("2023-03-12 02:30:00", eastern), None);
    }

    #[test]
    fn invalid_rows_are_dropped_and_counted() {
        let bad_ts = raw_order("O2", "91", "not a date");
        let no_mobile = RawOrder { mobile_number: None, ..raw_order("O3", "", "2024-01-01 00:00:00") };
        let (orders, warnings) = clean_orders(
            vec![raw_order("O1", "91", "2024-01-01 00:00:00"), bad_ts, no_mobile],
            kolkata(),
        );
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, "O1");
        assert_eq!(warnings, vec![CleanWarning::InvalidOrders { dropped: 2 }]);
    }

    #[test]
    fn duplicate_order_id_first_occurrence_wins() {
        let mut second = raw_order("O1", "92", "2024-02-01 00:00:00");
        second.total_amount = Some("999".to_string());
        let (orders, warnings) = clean_orders(
            vec![raw_order("O1", "91", "2024-01-01 00:00:00"), second],
            kolkata(),
        );
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].mobile_number, "91");
        assert_eq!(warnings, vec![CleanWarning::DuplicateOrders { dropped: 1 }]);
    }

    #[test]
    fn unparseable_numbers_coerce_to_zero() {
        let mut order = raw_order("O1", "91", "2024-01-01 00:00:00");
        order.sku_count = Some("many".to_string());
        order.total_amount = Some("free".to_string());
        let (orders, _) = clean_orders(vec![order], kolkata());
        assert_eq!(orders[0].sku_count, 0);
        assert_eq!(orders[0].total_amount, 0.0);
    }

    #[test]
    fn float_rendered_counts_truncate() {
        assert_eq!(coerce_count(Some("3.0")), 3);
        assert_eq!(coerce_count(Some("3")), 3);
        assert_eq!(coerce_count(None), 0);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let raw = vec![
            raw_customer("C1", " asha ", " 91 ", " north east "),
            raw_customer("", "", "92", ""),
        ];
        let (once, _) = clean_customers(raw);
        let raw_again: Vec<RawCustomer> = once
            .iter()
            .map(|c| raw_customer(
                c.customer_id.as_deref().unwrap_or(""),
                &c.customer_name,
                &c.mobile_number,
                &c.region,
            ))
            .collect();
        let (twice, warnings) = clean_customers(raw_again);
        assert_eq!(once, twice);
        assert!(warnings.is_empty());
    }

    #[test]
    fn order_cleaning_is_idempotent() {
        let raw = vec![raw_order("O1", "91", "2024-01-15 10:30:00")];
        let (once, _) = clean_orders(raw, kolkata());
        let raw_again: Vec<RawOrder> = once
            .iter()
            .map(|o| RawOrder {
                order_id: Some(o.order_id.clone()),
                mobile_number: Some(o.mobile_number.clone()),
                order_date_time: Some(o.order_date_time.to_rfc3339()),
                sku_id: o.sku_id.clone(),
                sku_count: Some(o.sku_count.to_string()),
                total_amount: Some(o.total_amount.to_string()),
            })
            .collect();
        let (twice, warnings) = clean_orders(raw_again, kolkata());
        assert_eq!(once, twice);
        assert!(warnings.is_empty());
    }
}
