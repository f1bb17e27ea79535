use csv::StringRecord;
use polars::prelude::*;

use crate::schema::{na, raw};

/// Which positional fields of a record a chunk keeps, and which of them
/// must be present for the row to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub value_field: usize,
    /// Also keep customer and product ids; rows missing either are rejected.
    pub segmented: bool,
}

impl RowLayout {
    pub fn plain(value_field: usize) -> Self {
        Self {
            value_field,
            segmented: false,
        }
    }

    pub fn segmented(value_field: usize) -> Self {
        Self {
            value_field,
            segmented: true,
        }
    }

    fn key_columns(&self) -> &'static [&'static str] {
        if self.segmented {
            &[raw::DATE, raw::CUSTOMER, raw::PRODUCT]
        } else {
            &[raw::DATE]
        }
    }
}

/// True when a trimmed field text stands for a missing value.
pub fn is_na(text: &str) -> bool {
    na::MARKERS.contains(&text)
}

/// Trimmed text of a positional field, or `None` when absent or an NA marker.
pub fn field(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(str::trim)
        .filter(|text| !is_na(text))
        .map(str::to_string)
}

/// Column buffers for one chunk of raw records.
#[derive(Debug)]
pub struct RawChunk {
    layout: RowLayout,
    dates: Vec<Option<String>>,
    values: Vec<Option<String>>,
    customers: Vec<Option<String>>,
    products: Vec<Option<String>>,
}

impl RawChunk {
    pub fn with_capacity(layout: RowLayout, capacity: usize) -> Self {
        let keyed = if layout.segmented { capacity } else { 0 };
        Self {
            layout,
            dates: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            customers: Vec::with_capacity(keyed),
            products: Vec::with_capacity(keyed),
        }
    }

    pub fn push(&mut self, record: &StringRecord) {
        self.dates.push(field(record, raw::DATE_FIELD));
        self.values.push(field(record, self.layout.value_field));
        if self.layout.segmented {
            self.customers.push(field(record, raw::CUSTOMER_FIELD));
            self.products.push(field(record, raw::PRODUCT_FIELD));
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// All-string frame of the kept fields.
    pub fn into_frame(self) -> PolarsResult<DataFrame> {
        if self.layout.segmented {
            polars::df!(
                raw::DATE => self.dates,
                raw::CUSTOMER => self.customers,
                raw::PRODUCT => self.products,
                raw::VALUE => self.values
            )
        } else {
            polars::df!(
                raw::DATE => self.dates,
                raw::VALUE => self.values
            )
        }
    }
}

/// Cast the value column to Float64. The cast is non-strict: text that is
/// not a number becomes null instead of failing the chunk.
pub fn coerce_values(lazy: LazyFrame) -> LazyFrame {
    lazy.with_columns([col(raw::VALUE)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(DataType::Float64)])
}

/// Keep only rows with every key present and a real number as value.
pub fn drop_rejected(lazy: LazyFrame, layout: RowLayout) -> LazyFrame {
    let keep = layout.key_columns().iter().fold(
        col(raw::VALUE)
            .is_not_null()
            .and(col(raw::VALUE).is_not_nan()),
        |acc, key| acc.and(col(*key).is_not_null()),
    );
    lazy.filter(keep)
}

/// Coerce and filter a raw chunk frame in one go.
pub fn valid_rows(frame: DataFrame, layout: RowLayout) -> PolarsResult<DataFrame> {
    drop_rejected(coerce_values(frame.lazy()), layout).collect()
}

/// Predicate selecting the rows of one customer. Ids are compared as
/// numbers so `231013` and `231013.0` are the same customer.
pub fn customer_is(customer: i64) -> Expr {
    col(raw::CUSTOMER)
        .cast(DataType::Float64)
        .eq(lit(customer as f64))
}
