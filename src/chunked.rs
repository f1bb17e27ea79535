//! Bounded-memory aggregation of one sales file.
//!
//! Records are streamed with the `csv` crate in fixed-size chunks. Each chunk
//! is coerced, filtered and group-summed as a polars frame, and the per-key
//! sums are folded into a [`PartialAggregate`] that lives for the whole file.
//! Peak memory is one chunk plus one entry per distinct key.

use std::collections::HashMap;
use std::fs::File;
use std::hash::Hash;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use polars::prelude::*;

use crate::coerce::{self, RawChunk, RowLayout};
use crate::error::Result;
use crate::schema::raw::{DATE, VALUE};
use crate::table::{MetricTable, ProductTable};

/// Running key → sum mapping for one file.
#[derive(Debug, Clone)]
pub struct PartialAggregate<K> {
    sums: HashMap<K, f64>,
}

impl<K> Default for PartialAggregate<K> {
    fn default() -> Self {
        Self {
            sums: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> PartialAggregate<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, value: f64) {
        *self.sums.entry(key).or_insert(0.0) += value;
    }

    /// Fold another aggregate into this one.
    pub fn merge(&mut self, other: PartialAggregate<K>) {
        for (key, value) in other.sums {
            self.add(key, value);
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.sums.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

impl PartialAggregate<String> {
    pub fn into_table(self) -> Result<MetricTable> {
        MetricTable::from_rows(self.sums)
    }
}

impl PartialAggregate<(String, String)> {
    pub fn into_table(self) -> Result<ProductTable> {
        ProductTable::from_rows(self.sums)
    }
}

/// Rows seen and kept while reading one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub chunks: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
}

impl FileSummary {
    pub fn rows_rejected(&self) -> usize {
        self.rows_read - self.rows_kept
    }

    pub(crate) fn record_chunk(&mut self, read: usize, kept: usize) {
        self.chunks += 1;
        self.rows_read += read;
        self.rows_kept += kept;
    }
}

/// Streams raw chunks of at most `chunk_size` records as string frames.
pub struct ChunkReader<R: Read> {
    reader: csv::Reader<R>,
    record: StringRecord,
    layout: RowLayout,
    chunk_size: usize,
    finished: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R, layout: RowLayout, chunk_size: usize) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            record: StringRecord::new(),
            layout,
            chunk_size: chunk_size.max(1),
            finished: false,
        }
    }

    /// Next chunk, or `None` once the source is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<RawChunk>> {
        if self.finished {
            return Ok(None);
        }
        let mut chunk = RawChunk::with_capacity(self.layout, self.chunk_size.min(64 * 1024));
        while chunk.len() < self.chunk_size {
            if !self.reader.read_record(&mut self.record)? {
                self.finished = true;
                break;
            }
            chunk.push(&self.record);
        }
        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}

/// Group-sum one valid chunk by date and merge it into `total`.
pub fn absorb_by_date(valid: &DataFrame, total: &mut PartialAggregate<String>) -> Result<()> {
    let sums = valid
        .clone()
        .lazy()
        .group_by([col(DATE)])
        .agg([col(VALUE).sum()])
        .collect()?;

    let dates = sums.column(DATE)?.str()?;
    let values = sums.column(VALUE)?.f64()?;
    let mut chunk = PartialAggregate::new();
    for (date, value) in dates.into_iter().zip(values.into_iter()) {
        if let (Some(date), Some(value)) = (date, value) {
            chunk.add(date.to_string(), value);
        }
    }
    total.merge(chunk);
    Ok(())
}

/// Aggregate a whole CSV stream by date.
pub fn aggregate_reader<R: Read>(
    source: R,
    layout: RowLayout,
    chunk_size: usize,
) -> Result<(PartialAggregate<String>, FileSummary)> {
    let mut reader = ChunkReader::new(source, layout, chunk_size);
    let mut total = PartialAggregate::new();
    let mut summary = FileSummary::default();

    while let Some(chunk) = reader.next_chunk()? {
        let read = chunk.len();
        let valid = coerce::valid_rows(chunk.into_frame()?, layout)?;
        absorb_by_date(&valid, &mut total)?;
        summary.record_chunk(read, valid.height());
        debug!(
            "chunk {}: {} rows, {} kept, {} keys so far",
            summary.chunks,
            read,
            valid.height(),
            total.len()
        );
    }

    Ok((total, summary))
}

/// Open a source file; an unopenable file is reported and treated as absent.
pub(crate) fn open_source(path: &Path) -> Option<File> {
    match File::open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("⚠️ Could not open {}: {e}. Skipping.", path.display());
            None
        }
    }
}

pub(crate) fn log_summary(path: &Path, summary: &FileSummary, keys: usize) {
    info!(
        "   ✅ {}: {} rows read, {} kept, {} rejected, {} keys",
        path.display(),
        summary.rows_read,
        summary.rows_kept,
        summary.rows_rejected(),
        keys
    );
}

/// Aggregate one sales file by date. `Ok(None)` when the file cannot be opened.
pub fn aggregate_file(
    path: &Path,
    layout: RowLayout,
    chunk_size: usize,
) -> Result<Option<PartialAggregate<String>>> {
    let Some(file) = open_source(path) else {
        return Ok(None);
    };
    let (total, summary) = aggregate_reader(file, layout, chunk_size)?;
    log_summary(path, &summary, total.len());
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::test_support::{assert_close, line};

    fn sample() -> String {
        let mut csv = String::new();
        for day in 1..=9 {
            for n in 0..day {
                csv.push_str(&line(&format!("2024-01-0{day}"), "1", "A", &format!("{}.5", n)));
            }
        }
        csv.push_str(&line("2024-01-01", "1", "A", "bad"));
        csv.push_str(&line("2024-01-10", "1", "A", "bad"));
        csv
    }

    #[test]
    fn accumulates_across_chunks() {
        let mut agg = PartialAggregate::new();
        agg.add("a".to_string(), 1.0);
        agg.add("a".to_string(), 2.5);
        agg.add("b".to_string(), 4.0);
        assert_eq!(agg.get(&"a".to_string()), Some(3.5));
        assert_eq!(agg.len(), 2);

        let mut other = PartialAggregate::new();
        other.add("b".to_string(), 1.0);
        agg.merge(other);
        assert_eq!(agg.get(&"b".to_string()), Some(5.0));
    }

    #[test]
    fn chunk_size_does_not_change_sums() {
        let csv = sample();
        let layout = RowLayout::plain(13);
        let (whole, whole_summary) = aggregate_reader(csv.as_bytes(), layout, 500_000).unwrap();
        assert_eq!(whole_summary.chunks, 1);

        for chunk_size in [1, 2, 7, 13] {
            let (chunked, summary) = aggregate_reader(csv.as_bytes(), layout, chunk_size).unwrap();
            assert!(summary.chunks > 1);
            assert_eq!(summary.rows_read, whole_summary.rows_read);
            assert_eq!(chunked.len(), whole.len());
            for day in 1..=9 {
                let key = format!("2024-01-0{day}");
                assert_close(chunked.get(&key).unwrap(), whole.get(&key).unwrap());
            }
        }
    }

    #[test]
    fn malformed_only_key_never_appears() {
        let (agg, summary) = aggregate_reader(sample().as_bytes(), RowLayout::plain(13), 4).unwrap();
        assert_eq!(agg.get(&"2024-01-10".to_string()), None);
        assert_close(agg.get(&"2024-01-01".to_string()).unwrap(), 0.5);
        assert_eq!(summary.rows_rejected(), 2);
    }

    #[test]
    fn transactions_read_column_fourteen() {
        let mut fields = vec![""; 15];
        fields[0] = "2024-01-01";
        fields[13] = "100";
        fields[14] = "3";
        let csv = format!("{}\n", fields.join(","));

        let (agg, _) = aggregate_reader(csv.as_bytes(), RowLayout::plain(14), 10).unwrap();
        assert_eq!(agg.get(&"2024-01-01".to_string()), Some(3.0));
    }

    #[test]
    fn empty_source_yields_empty_aggregate() {
        let (agg, summary) = aggregate_reader("".as_bytes(), RowLayout::plain(13), 10).unwrap();
        assert!(agg.is_empty());
        assert_eq!(summary.chunks, 0);
        assert!(agg.into_table().unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_mid_file_halts() {
        let mut bytes = line("2024-01-01", "1", "A", "2").into_bytes();
        bytes.extend_from_slice(b"2024-01-02,\xff,1,A\n");

        let result = aggregate_reader(bytes.as_slice(), RowLayout::plain(13), 10);
        assert!(matches!(result, Err(ReportError::Csv(_))));
    }

    #[test]
    fn blank_lines_and_padded_values() {
        let csv = [
            "\n".to_string(),
            line("2024-01-01", "1", "A", " 3 "),
            line("2024-01-01", "1", "A", "  "),
            line("2024-01-01", "1", "A", "1e1"),
        ]
        .concat();

        let (agg, summary) = aggregate_reader(csv.as_bytes(), RowLayout::plain(13), 1).unwrap();
        assert_close(agg.get(&"2024-01-01".to_string()).unwrap(), 13.0);
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_kept, 2);
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let result = aggregate_file(&dir.path().join("nope.csv"), RowLayout::plain(13), 10).unwrap();
        assert!(result.is_none());
    }
}
