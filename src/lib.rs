//! Streaming aggregation of partitioned retail sales extracts into
//! per-market validation workbooks.

pub mod chunked;
pub mod coerce;
pub mod combine;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod market;
pub mod merge;
pub mod pipeline;
pub mod schema;
pub mod segment;
pub mod table;

#[cfg(test)]
mod test_support;

pub use config::RunConfig;
pub use error::{ReportError, Result};
pub use market::{CombineRule, Market, Metric, MxMode};
pub use table::{MarketReport, MetricTable, MxReport, MxSheet, ProductTable};
