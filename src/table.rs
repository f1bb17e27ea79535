//! Typed tables with fixed, named columns.
//!
//! Each table wraps a polars `DataFrame` whose schema is checked once at
//! construction; callers read rows through typed accessors instead of
//! reaching into columns by name.

use polars::prelude::*;

use crate::error::{ReportError, Result};
use crate::market::{Market, Metric, MxMode};
use crate::schema::metric_table::{DATE, PRODUCT, VALUE};

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ReportError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn sorted_by(df: DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let keys: Vec<PlSmallStr> = keys.iter().map(|k| PlSmallStr::from(*k)).collect();
    Ok(df.lazy().sort(keys, SortMultipleOptions::default()).collect()?)
}

/// `{date, value}` with one row per distinct date, sorted by date.
#[derive(Debug, Clone)]
pub struct MetricTable {
    frame: DataFrame,
}

impl MetricTable {
    /// Build from distinct `(date, value)` pairs.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, f64)>) -> Result<Self> {
        let (dates, values): (Vec<String>, Vec<f64>) = rows.into_iter().unzip();
        let frame = polars::df!(DATE => dates, VALUE => values)?;
        Self::from_frame(frame)
    }

    /// Wrap a frame that already holds one row per date.
    pub(crate) fn from_frame(frame: DataFrame) -> Result<Self> {
        require_columns(&frame, &[DATE, VALUE])?;
        let frame = frame.select([DATE, VALUE])?;
        Ok(Self {
            frame: sorted_by(frame, &[DATE])?,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn rows(&self) -> Result<Vec<(String, f64)>> {
        let dates = self.frame.column(DATE)?.str()?;
        let values = self.frame.column(VALUE)?.f64()?;
        Ok(dates
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(d, v)| Some((d?.to_string(), v?)))
            .collect())
    }

    pub fn get(&self, date: &str) -> Result<Option<f64>> {
        Ok(self
            .rows()?
            .into_iter()
            .find(|(d, _)| d == date)
            .map(|(_, v)| v))
    }
}

/// `{date, product, value}` with one row per distinct pair, sorted by both keys.
#[derive(Debug, Clone)]
pub struct ProductTable {
    frame: DataFrame,
}

impl ProductTable {
    pub fn from_rows(rows: impl IntoIterator<Item = ((String, String), f64)>) -> Result<Self> {
        let mut dates = Vec::new();
        let mut products = Vec::new();
        let mut values = Vec::new();
        for ((date, product), value) in rows {
            dates.push(date);
            products.push(product);
            values.push(value);
        }
        let frame = polars::df!(DATE => dates, PRODUCT => products, VALUE => values)?;
        Self::from_frame(frame)
    }

    pub(crate) fn from_frame(frame: DataFrame) -> Result<Self> {
        require_columns(&frame, &[DATE, PRODUCT, VALUE])?;
        let frame = frame.select([DATE, PRODUCT, VALUE])?;
        Ok(Self {
            frame: sorted_by(frame, &[DATE, PRODUCT])?,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn rows(&self) -> Result<Vec<(String, String, f64)>> {
        let dates = self.frame.column(DATE)?.str()?;
        let products = self.frame.column(PRODUCT)?.str()?;
        let values = self.frame.column(VALUE)?.f64()?;
        Ok(dates
            .into_iter()
            .zip(products.into_iter())
            .zip(values.into_iter())
            .filter_map(|((d, p), v)| Some((d?.to_string(), p?.to_string(), v?)))
            .collect())
    }
}

/// Date-indexed wide table for one market: `date` plus one column per
/// metric that had data, zero-filled and sorted by date.
#[derive(Debug, Clone)]
pub struct MarketReport {
    market: Market,
    metrics: Vec<Metric>,
    frame: DataFrame,
}

impl MarketReport {
    pub(crate) fn from_frame(market: Market, metrics: Vec<Metric>, frame: DataFrame) -> Result<Self> {
        let mut columns = vec![DATE];
        columns.extend(metrics.iter().map(|m| m.column_name()));
        require_columns(&frame, &columns)?;
        let frame = frame.select(columns)?;
        Ok(Self {
            market,
            metrics,
            frame: sorted_by(frame, &[DATE])?,
        })
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// Metrics present in the report, in column order.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn dates(&self) -> Result<Vec<String>> {
        Ok(self
            .frame
            .column(DATE)?
            .str()?
            .into_iter()
            .map(|d| d.unwrap_or_default().to_string())
            .collect())
    }

    /// Values of one metric column; `None` when the metric had no data.
    pub fn values(&self, metric: Metric) -> Result<Option<Vec<f64>>> {
        if !self.metrics.contains(&metric) {
            return Ok(None);
        }
        let values = self
            .frame
            .column(metric.column_name())?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        Ok(Some(values))
    }

    pub fn value(&self, date: &str, metric: Metric) -> Result<Option<f64>> {
        let Some(values) = self.values(metric)? else {
            return Ok(None);
        };
        Ok(self
            .dates()?
            .iter()
            .position(|d| d == date)
            .map(|i| values[i]))
    }
}

/// One metric's block of the MX workbook.
#[derive(Debug, Clone)]
pub struct MxSheet {
    pub metric: Metric,
    pub total: MetricTable,
    /// Segment customer by date; `None` when the customer had no rows.
    pub segment: Option<MetricTable>,
    /// Segment customer by date and product; volume only.
    pub segment_by_product: Option<ProductTable>,
}

/// The MX report: one sheet per metric with total data.
#[derive(Debug, Clone)]
pub struct MxReport {
    pub mode: MxMode,
    pub segment_customer: i64,
    pub sheets: Vec<MxSheet>,
}

impl MxReport {
    pub fn sheet(&self, metric: Metric) -> Option<&MxSheet> {
        self.sheets.iter().find(|s| s.metric == metric)
    }
}
