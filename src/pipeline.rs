//! End-to-end runs: discovery → per-file aggregation → part combination →
//! metric merge. Files are processed one at a time.

use log::{info, warn};

use crate::chunked;
use crate::coerce::RowLayout;
use crate::combine;
use crate::config::RunConfig;
use crate::discovery;
use crate::error::Result;
use crate::market::{CombineRule, Market, Metric, MxMode};
use crate::merge;
use crate::segment::{self, SegmentQuery, SegmentTables};
use crate::table::{MarketReport, MetricTable, MxReport, MxSheet};

/// Aggregate one metric across the given parts; `None` when no part had data.
pub fn aggregate_metric(
    config: &RunConfig,
    parts: &[String],
    metric: Metric,
    rule: CombineRule,
) -> Result<Option<MetricTable>> {
    let layout = RowLayout::plain(metric.value_field());
    let mut tables = Vec::new();

    for part in parts {
        let Some(path) = discovery::find_metric_file(&config.input_dir, part, metric)? else {
            continue;
        };
        info!("📄 Processing {} from {part} for {metric}", path.display());
        if let Some(partial) =
            chunked::aggregate_file(&path, layout, config.effective_chunk_size())?
        {
            tables.push(partial.into_table()?);
        }
    }

    combine::combine_parts(tables, rule)
}

/// Build the date × metric report of one market.
pub fn build_market_report(config: &RunConfig, market: Market) -> Result<Option<MarketReport>> {
    let parts = market.parts();
    let mut tables = Vec::new();

    for metric in Metric::ALL {
        match aggregate_metric(config, &parts, metric, market.combine_rule())? {
            Some(table) => tables.push((metric, table)),
            None => warn!("❌ No data for {metric} in {market}"),
        }
    }

    merge::merge_metrics(market, tables)
}

fn build_mx_sheet(config: &RunConfig, parts: &[String], metric: Metric) -> Result<Option<MxSheet>> {
    let query = SegmentQuery {
        metric,
        customer: config.segment_customer,
    };
    let mut per_part: Vec<SegmentTables> = Vec::new();

    for part in parts {
        let Some(path) = discovery::find_metric_file(&config.input_dir, part, metric)? else {
            continue;
        };
        info!(
            "📄 Processing {} from {part} for {}",
            path.display(),
            metric.label()
        );
        if let Some(acc) = segment::aggregate_file(&path, &query, config.effective_chunk_size())? {
            per_part.push(acc.into_tables()?);
        }
    }

    let mut totals = Vec::new();
    let mut segments = Vec::new();
    let mut by_product = Vec::new();
    for tables in per_part {
        totals.push(tables.total);
        segments.push(tables.segment);
        by_product.push(tables.segment_by_product);
    }

    let Some(total) = combine::combine_parts(totals, CombineRule::Union)? else {
        return Ok(None);
    };
    let segment = combine::combine_parts(segments, CombineRule::Union)?;
    let segment_by_product = if metric == Metric::Volume {
        combine::combine_products(by_product)?
    } else {
        None
    };

    info!(
        "   ✅ Rows total: {} | segment: {} | segment by product: {}",
        total.len(),
        segment.as_ref().map_or(0, MetricTable::len),
        segment_by_product.as_ref().map_or(0, |t| t.len())
    );

    Ok(Some(MxSheet {
        metric,
        total,
        segment,
        segment_by_product,
    }))
}

/// Build the MX report with the segment customer's breakdowns.
pub fn build_mx_report(config: &RunConfig, mode: MxMode) -> Result<Option<MxReport>> {
    let parts = mode.parts();
    let mut sheets = Vec::new();

    for metric in Metric::ALL {
        match build_mx_sheet(config, &parts, metric)? {
            Some(sheet) => sheets.push(sheet),
            None => warn!("❌ No data for {} -- sheet skipped.", metric.label()),
        }
    }

    if sheets.is_empty() {
        return Ok(None);
    }
    Ok(Some(MxReport {
        mode,
        segment_customer: config.segment_customer,
        sheets,
    }))
}
