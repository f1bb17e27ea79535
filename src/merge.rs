use polars::prelude::*;

use crate::error::Result;
use crate::market::{Market, Metric};
use crate::schema::metric_table::{DATE, VALUE};
use crate::table::{MarketReport, MetricTable};

/// Outer-join the metric tables of one market on date.
///
/// Dates missing from a metric's table read as zero in that column. Columns
/// follow the fixed metric order regardless of input order. `None` when no
/// metric produced data.
pub fn merge_metrics(
    market: Market,
    tables: Vec<(Metric, MetricTable)>,
) -> Result<Option<MarketReport>> {
    let mut tables = tables;
    tables.sort_by_key(|(metric, _)| *metric);
    tables.dedup_by_key(|(metric, _)| *metric);

    let metrics: Vec<Metric> = tables.iter().map(|(m, _)| *m).collect();
    let mut frames = tables.into_iter().map(|(metric, table)| {
        table
            .frame()
            .clone()
            .lazy()
            .select([col(DATE), col(VALUE).alias(metric.column_name())])
    });

    let Some(first) = frames.next() else {
        return Ok(None);
    };
    let joined = frames.fold(first, |acc, next| {
        acc.join(
            next,
            [col(DATE)],
            [col(DATE)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
    });

    let zero_filled: Vec<Expr> = metrics
        .iter()
        .map(|m| col(m.column_name()).fill_null(lit(0.0)))
        .collect();
    let df = joined.with_columns(zero_filled).collect()?;

    MarketReport::from_frame(market, metrics, df).map(Some)
}
