//! Fixtures shared by the unit tests.

use csv::StringRecord;

/// A 15-field sales record with the value in both metric columns.
pub fn record(date: &str, customer: &str, product: &str, value: &str) -> StringRecord {
    let mut fields = vec![""; 15];
    fields[0] = date;
    fields[2] = customer;
    fields[3] = product;
    fields[13] = value;
    fields[14] = value;
    StringRecord::from(fields)
}

/// The same record rendered as one CSV line.
pub fn line(date: &str, customer: &str, product: &str, value: &str) -> String {
    let r = record(date, customer, product, value);
    let fields: Vec<&str> = r.iter().collect();
    format!("{}\n", fields.join(","))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
