use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::info;

use crate::domain::{RawCustomer, RawOrder};
use crate::error::{PipelineError, Result};

/// The six fields every order record is required to carry.
pub const ORDER_FIELDS: [&str; 6] = [
    "order_id",
    "mobile_number",
    "order_date_time",
    "sku_id",
    "sku_count",
    "total_amount",
];

/// Load customers from a delimited file.
///
/// Every field is kept as text; identifiers like mobile numbers must never go
/// through a numeric type here or leading zeros and precision are lost.
pub fn load_customers(path: &Path) -> Result<Vec<RawCustomer>> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound { path: path.to_path_buf() });
    }
    info!("Loading customers CSV: {}", path.display());

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<RawCustomer>() {
        rows.push(record?);
    }

    info!("Customers loaded: {} rows", rows.len());
    Ok(rows)
}

/// Load orders from an XML document with repeated `<order>` elements.
///
/// Validates that all six required fields occur somewhere in the document and
/// fails with a `Schema` error (missing names sorted) otherwise. Field values
/// are collected as text; `mobile_number` additionally goes through a
/// numeric-then-string conversion to strip float artifacts such as a trailing
/// `.0` before it is treated as an opaque key.
pub fn load_orders(path: &Path) -> Result<Vec<RawOrder>> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound { path: path.to_path_buf() });
    }
    info!("Loading orders XML: {}", path.display());

    let content = fs::read_to_string(path)?;
    let records = parse_order_records(&content)?;

    let missing: Vec<String> = ORDER_FIELDS
        .iter()
        .filter(|&&field| !records.iter().any(|r| r.contains_key(field)))
        .map(|&field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::missing_fields(missing));
    }

    let rows: Vec<RawOrder> = records
        .into_iter()
        .map(|mut fields| RawOrder {
            order_id: fields.remove("order_id"),
            mobile_number: fields.remove("mobile_number").map(|v| normalize_mobile(&v)),
            order_date_time: fields.remove("order_date_time"),
            sku_id: fields.remove("sku_id"),
            sku_count: fields.remove("sku_count"),
            total_amount: fields.remove("total_amount"),
        })
        .collect();

    info!("Orders loaded: {} rows", rows.len());
    Ok(rows)
}

/// Walk the document: depth 1 is the collection root, each depth-2 element is
/// one record, and its depth-3 children are that record's fields.
fn parse_order_records(content: &str) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();

    let mut records: Vec<HashMap<String, String>> = Vec::new();
    let mut current: HashMap<String, String> = HashMap::new();
    let mut field: Option<String> = None;
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                match depth {
                    2 => current.clear(),
                    3 => {
                        field = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) if depth == 2 => {
                // Self-closing field element: present, but empty.
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                current.insert(name, String::new());
            }
            Event::Text(ref e) if depth == 3 => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                match quick_xml::escape::unescape(&raw) {
                    Ok(value) => text.push_str(&value),
                    // Malformed entities are a data issue, not structural.
                    Err(_) => text.push_str(&raw),
                }
            }
            Event::End(_) => {
                match depth {
                    3 => {
                        if let Some(name) = field.take() {
                            current.insert(name, std::mem::take(&mut text));
                        }
                    }
                    2 => records.push(std::mem::take(&mut current)),
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

/// Strip float-formatting artifacts from a numeric-looking identifier, e.g.
/// `"91000000001.0"` becomes `"91000000001"`. Non-numeric values pass through
/// trimmed but untouched.
fn normalize_mobile(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e18 {
            return format!("{}", value as i64);
        }
    }
    trimmed.to_string()
}
