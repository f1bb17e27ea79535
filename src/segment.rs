//! MX segment extraction.
//!
//! Alongside the plain total, the MX pass tracks the rows of one customer
//! (the vending channel) by date, and for volume also by date × product.
//! All three aggregates are filled from the same chunk scan.

use std::io::Read;
use std::path::Path;

use log::debug;
use polars::prelude::*;

use crate::chunked::{self, ChunkReader, FileSummary, PartialAggregate};
use crate::coerce::{self, RowLayout};
use crate::error::Result;
use crate::market::Metric;
use crate::schema::raw::{DATE, PRODUCT, VALUE};
use crate::table::{MetricTable, ProductTable};

/// The three running aggregates of one MX file.
#[derive(Debug, Clone, Default)]
pub struct SegmentedAggregate {
    pub total: PartialAggregate<String>,
    pub segment: PartialAggregate<String>,
    /// Only filled for volume.
    pub segment_by_product: PartialAggregate<(String, String)>,
}

impl SegmentedAggregate {
    pub fn into_tables(self) -> Result<SegmentTables> {
        Ok(SegmentTables {
            total: self.total.into_table()?,
            segment: self.segment.into_table()?,
            segment_by_product: self.segment_by_product.into_table()?,
        })
    }
}

/// Finalized tables of one MX file.
#[derive(Debug, Clone)]
pub struct SegmentTables {
    pub total: MetricTable,
    pub segment: MetricTable,
    pub segment_by_product: ProductTable,
}

/// What to extract and for whom.
#[derive(Debug, Clone, Copy)]
pub struct SegmentQuery {
    pub metric: Metric,
    pub customer: i64,
}

impl SegmentQuery {
    pub fn layout(&self) -> RowLayout {
        RowLayout::segmented(self.metric.value_field())
    }

    fn wants_products(&self) -> bool {
        self.metric == Metric::Volume
    }
}

fn absorb_by_product(
    valid: &DataFrame,
    by_product: &mut PartialAggregate<(String, String)>,
) -> Result<()> {
    let sums = valid
        .clone()
        .lazy()
        .group_by([col(DATE), col(PRODUCT)])
        .agg([col(VALUE).sum()])
        .collect()?;

    let dates = sums.column(DATE)?.str()?;
    let products = sums.column(PRODUCT)?.str()?;
    let values = sums.column(VALUE)?.f64()?;
    let mut chunk = PartialAggregate::new();
    for ((date, product), value) in dates
        .into_iter()
        .zip(products.into_iter())
        .zip(values.into_iter())
    {
        if let (Some(date), Some(product), Some(value)) = (date, product, value) {
            chunk.add((date.to_string(), product.to_string()), value);
        }
    }
    by_product.merge(chunk);
    Ok(())
}

/// Fold one valid chunk into all three aggregates.
pub fn absorb_chunk(
    valid: &DataFrame,
    query: &SegmentQuery,
    acc: &mut SegmentedAggregate,
) -> Result<()> {
    chunked::absorb_by_date(valid, &mut acc.total)?;

    let segment_rows = valid
        .clone()
        .lazy()
        .filter(coerce::customer_is(query.customer))
        .collect()?;
    if segment_rows.height() == 0 {
        return Ok(());
    }

    chunked::absorb_by_date(&segment_rows, &mut acc.segment)?;
    if query.wants_products() {
        absorb_by_product(&segment_rows, &mut acc.segment_by_product)?;
    }
    Ok(())
}

pub fn aggregate_reader<R: Read>(
    source: R,
    query: &SegmentQuery,
    chunk_size: usize,
) -> Result<(SegmentedAggregate, FileSummary)> {
    let layout = query.layout();
    let mut reader = ChunkReader::new(source, layout, chunk_size);
    let mut acc = SegmentedAggregate::default();
    let mut summary = FileSummary::default();

    while let Some(chunk) = reader.next_chunk()? {
        let read = chunk.len();
        let valid = coerce::valid_rows(chunk.into_frame()?, layout)?;
        absorb_chunk(&valid, query, &mut acc)?;
        summary.record_chunk(read, valid.height());
        debug!(
            "chunk {}: {} rows, {} kept, {} segment keys",
            summary.chunks,
            read,
            valid.height(),
            acc.segment.len()
        );
    }

    Ok((acc, summary))
}

/// Segmented aggregation of one MX file. `Ok(None)` when it cannot be opened.
pub fn aggregate_file(
    path: &Path,
    query: &SegmentQuery,
    chunk_size: usize,
) -> Result<Option<SegmentedAggregate>> {
    let Some(file) = chunked::open_source(path) else {
        return Ok(None);
    };
    let (acc, summary) = aggregate_reader(file, query, chunk_size)?;
    chunked::log_summary(path, &summary, acc.total.len());
    Ok(Some(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_close, line};

    fn query(metric: Metric) -> SegmentQuery {
        SegmentQuery {
            metric,
            customer: 231013,
        }
    }

    fn key(date: &str) -> String {
        date.to_string()
    }

    #[test]
    fn segment_is_a_subset_of_total() {
        let csv = [
            line("2024-05-01", "231013", "SKU1", "10"),
            line("2024-05-01", "999999", "SKU1", "10"),
        ]
        .concat();

        let (acc, _) = aggregate_reader(csv.as_bytes(), &query(Metric::Volume), 100).unwrap();
        assert_close(acc.total.get(&key("2024-05-01")).unwrap(), 20.0);
        assert_close(acc.segment.get(&key("2024-05-01")).unwrap(), 10.0);
    }

    #[test]
    fn products_are_broken_down_for_volume_only() {
        let csv = [
            line("2024-05-01", "231013", "SKU1", "1"),
            line("2024-05-01", "231013", "SKU2", "2"),
            line("2024-05-01", "231013", "SKU1", "4"),
            line("2024-05-02", "231013", "SKU1", "8"),
        ]
        .concat();

        let (volume, _) = aggregate_reader(csv.as_bytes(), &query(Metric::Volume), 3).unwrap();
        let by_product = &volume.segment_by_product;
        assert_eq!(by_product.len(), 3);
        assert_close(
            by_product
                .get(&(key("2024-05-01"), "SKU1".to_string()))
                .unwrap(),
            5.0,
        );

        let (revenue, _) = aggregate_reader(csv.as_bytes(), &query(Metric::Revenue), 3).unwrap();
        assert!(revenue.segment_by_product.is_empty());
        assert_close(revenue.segment.get(&key("2024-05-01")).unwrap(), 7.0);
    }

    #[test]
    fn rows_missing_product_leave_total_too() {
        let csv = [
            line("2024-05-01", "231013", "", "10"),
            line("2024-05-01", "", "SKU1", "10"),
            line("2024-05-01", "5", "SKU1", "1"),
        ]
        .concat();

        let (acc, summary) = aggregate_reader(csv.as_bytes(), &query(Metric::Volume), 100).unwrap();
        assert_close(acc.total.get(&key("2024-05-01")).unwrap(), 1.0);
        assert!(acc.segment.is_empty());
        assert_eq!(summary.rows_rejected(), 2);
    }

    #[test]
    fn finalized_tables_are_sorted() {
        let csv = [
            line("2024-05-02", "231013", "SKU2", "3"),
            line("2024-05-01", "231013", "SKU1", "3"),
        ]
        .concat();
        let (acc, _) = aggregate_reader(csv.as_bytes(), &query(Metric::Volume), 10).unwrap();
        let tables = acc.into_tables().unwrap();
        assert_eq!(tables.total.rows().unwrap()[0].0, "2024-05-01");
        assert_eq!(tables.segment.len(), 2);
        assert_eq!(tables.segment_by_product.rows().unwrap()[1].1, "SKU2");
    }
}
