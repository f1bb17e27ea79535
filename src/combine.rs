use log::debug;
use polars::prelude::*;

use crate::error::Result;
use crate::market::CombineRule;
use crate::schema::additive::{LEFT_VALUE, RIGHT_VALUE};
use crate::schema::metric_table::{DATE, PRODUCT, VALUE};
use crate::table::{MetricTable, ProductTable};

/// Fold the per-part tables of one metric into a single table.
///
/// Empty parts are dropped first; `None` means no part had data and the
/// metric is absent for the market. The additive rule only applies when
/// exactly two parts remain, otherwise parts are unioned.
pub fn combine_parts(parts: Vec<MetricTable>, rule: CombineRule) -> Result<Option<MetricTable>> {
    let mut parts: Vec<MetricTable> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    match (rule, parts.len()) {
        (_, 0) => Ok(None),
        (_, 1) => Ok(parts.pop()),
        (CombineRule::Additive, 2) => additive(&parts[0], &parts[1]).map(Some),
        _ => union(&parts).map(Some),
    }
}

/// Concatenate all parts and re-group by date, summing.
pub fn union(parts: &[MetricTable]) -> Result<MetricTable> {
    debug!("union of {} parts", parts.len());
    let frames: Vec<LazyFrame> = parts.iter().map(|p| p.frame().clone().lazy()).collect();
    let df = concat(frames, UnionArgs::default())?
        .group_by([col(DATE)])
        .agg([col(VALUE).sum()])
        .collect()?;
    MetricTable::from_frame(df)
}

/// Outer-join two parts on date, read a missing side as zero and add.
pub fn additive(left: &MetricTable, right: &MetricTable) -> Result<MetricTable> {
    debug!("additive merge of two parts");
    let left = left
        .frame()
        .clone()
        .lazy()
        .select([col(DATE), col(VALUE).alias(LEFT_VALUE)]);
    let right = right
        .frame()
        .clone()
        .lazy()
        .select([col(DATE), col(VALUE).alias(RIGHT_VALUE)]);

    let df = left
        .join(
            right,
            [col(DATE)],
            [col(DATE)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
        .select([
            col(DATE),
            (col(LEFT_VALUE).fill_null(lit(0.0)) + col(RIGHT_VALUE).fill_null(lit(0.0)))
                .alias(VALUE),
        ])
        .collect()?;
    MetricTable::from_frame(df)
}

/// Union rule for the segment-by-product tables; `None` when all are empty.
pub fn combine_products(parts: Vec<ProductTable>) -> Result<Option<ProductTable>> {
    let parts: Vec<ProductTable> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Ok(None);
    }
    let frames: Vec<LazyFrame> = parts.iter().map(|p| p.frame().clone().lazy()).collect();
    let df = concat(frames, UnionArgs::default())?
        .group_by([col(DATE), col(PRODUCT)])
        .agg([col(VALUE).sum()])
        .collect()?;
    ProductTable::from_frame(df).map(Some)
}
