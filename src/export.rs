//! Spreadsheet export.
//!
//! Reports are first laid out as plain cell lists, then rendered with
//! `rust_xlsxwriter` into a scratch file and moved into the output folder
//! only once the workbook is complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook};
use tempfile::NamedTempFile;

use crate::error::{ReportError, Result};
use crate::market::{Market, MxMode};
use crate::schema::sheet;
use crate::table::{MarketReport, MetricTable, MxReport, ProductTable};

/// Column offsets of the three MX blocks (A, F, K).
const MX_TOTAL_COL: u16 = 0;
const MX_SEGMENT_COL: u16 = 5;
const MX_PRODUCT_COL: u16 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub bold: bool,
}

/// Cells of one worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl SheetLayout {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
        }
    }

    fn text(&mut self, row: u32, col: u16, text: &str) {
        self.cells.push(Cell {
            row,
            col,
            value: CellValue::Text(text.to_string()),
            bold: false,
        });
    }

    fn title(&mut self, row: u32, col: u16, text: &str) {
        self.cells.push(Cell {
            row,
            col,
            value: CellValue::Text(text.to_string()),
            bold: true,
        });
    }

    fn number(&mut self, row: u32, col: u16, value: f64) {
        self.cells.push(Cell {
            row,
            col,
            value: CellValue::Number(value),
            bold: false,
        });
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    /// Header row at `row`, data from `row + 1`.
    fn metric_block(&mut self, row: u32, col: u16, label: &str, table: &MetricTable) -> Result<()> {
        self.text(row, col, sheet::DATE);
        self.text(row, col + 1, label);
        for (i, (date, value)) in table.rows()?.into_iter().enumerate() {
            let r = row + 1 + i as u32;
            self.text(r, col, &date);
            self.number(r, col + 1, value);
        }
        Ok(())
    }

    fn product_block(&mut self, row: u32, col: u16, label: &str, table: &ProductTable) -> Result<()> {
        self.text(row, col, sheet::DATE);
        self.text(row, col + 1, sheet::SKU);
        self.text(row, col + 2, label);
        for (i, (date, product, value)) in table.rows()?.into_iter().enumerate() {
            let r = row + 1 + i as u32;
            self.text(r, col, &date);
            self.text(r, col + 1, &product);
            self.number(r, col + 2, value);
        }
        Ok(())
    }
}

pub fn market_report_path(output_dir: &Path, market: Market) -> PathBuf {
    output_dir.join(format!("validation_report_{}.xlsx", market.code()))
}

pub fn mx_report_path(output_dir: &Path, mode: MxMode) -> PathBuf {
    output_dir.join(format!("validation_MX_{}.xlsx", mode.as_str()))
}

/// Single sheet: `Día` then one column per metric.
pub fn layout_market_report(report: &MarketReport) -> Result<Vec<SheetLayout>> {
    let mut layout = SheetLayout::new(sheet::REPORT_SHEET);
    layout.text(0, 0, sheet::REPORT_DATE);

    for (i, date) in report.dates()?.iter().enumerate() {
        layout.text(1 + i as u32, 0, date);
    }
    for (c, metric) in report.metrics().iter().enumerate() {
        let col = 1 + c as u16;
        layout.text(0, col, metric.column_name());
        let values = report.values(*metric)?.unwrap_or_default();
        for (i, value) in values.into_iter().enumerate() {
            layout.number(1 + i as u32, col, value);
        }
    }
    Ok(vec![layout])
}

/// One sheet per metric with the total, segment and segment-by-product blocks.
pub fn layout_mx_report(report: &MxReport) -> Result<Vec<SheetLayout>> {
    let segment_title = format!("Filtro {}", report.segment_customer);
    let product_title = format!("Filtro {} por SKU", report.segment_customer);

    let mut sheets = Vec::new();
    for mx_sheet in &report.sheets {
        let label = mx_sheet.metric.label();
        let mut layout = SheetLayout::new(label);

        layout.title(0, MX_TOTAL_COL, sheet::TOTAL_TITLE);
        layout.metric_block(1, MX_TOTAL_COL, label, &mx_sheet.total)?;

        if let Some(segment) = &mx_sheet.segment {
            layout.title(0, MX_SEGMENT_COL, &segment_title);
            layout.metric_block(1, MX_SEGMENT_COL, label, segment)?;
        }
        if let Some(by_product) = &mx_sheet.segment_by_product {
            layout.title(0, MX_PRODUCT_COL, &product_title);
            layout.product_block(1, MX_PRODUCT_COL, label, by_product)?;
        }
        sheets.push(layout);
    }
    Ok(sheets)
}

pub fn render(sheets: &[SheetLayout]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for layout in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&layout.name)?;
        for cell in &layout.cells {
            match (&cell.value, cell.bold) {
                (CellValue::Text(text), true) => {
                    worksheet.write_string_with_format(cell.row, cell.col, text, &bold)?;
                }
                (CellValue::Text(text), false) => {
                    worksheet.write_string(cell.row, cell.col, text)?;
                }
                (CellValue::Number(value), _) => {
                    worksheet.write_number(cell.row, cell.col, *value)?;
                }
            }
        }
        worksheet.autofit();
    }
    Ok(workbook)
}

fn copy_into_place(scratch: &Path, destination: &Path) -> io::Result<()> {
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".xlsx")
        .tempfile_in(dir)?;
    fs::copy(scratch, staged.path())?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

/// Move a finished scratch file to `destination`.
///
/// A plain rename is tried first; across file systems the file is copied to
/// a staging file beside the destination and renamed from there. On failure
/// the scratch file is kept and its path returned in the error.
pub fn relocate(scratch: NamedTempFile, destination: &Path) -> Result<()> {
    let scratch = match scratch.persist(destination) {
        Ok(_) => return Ok(()),
        Err(e) => e.file,
    };

    if let Err(source) = copy_into_place(scratch.path(), destination) {
        let (_, scratch_path) = scratch.keep().map_err(|e| ReportError::Io(e.error))?;
        return Err(ReportError::Export {
            destination: destination.to_path_buf(),
            scratch: scratch_path,
            source,
        });
    }
    Ok(())
}

pub fn save_workbook(sheets: &[SheetLayout], destination: &Path) -> Result<()> {
    if let Some(dir) = destination.parent() {
        fs::create_dir_all(dir)?;
    }

    let scratch = tempfile::Builder::new()
        .prefix("sales-validation-")
        .suffix(".xlsx")
        .tempfile()?;
    info!("📝 Writing workbook to temp path: {}", scratch.path().display());

    let mut workbook = render(sheets)?;
    workbook.save(scratch.path())?;

    if destination.exists() {
        warn!("🧹 Replacing existing {}", destination.display());
    }
    relocate(scratch, destination)?;
    info!("✅ Report saved to: {}", destination.display());
    Ok(())
}

pub fn export_market_report(report: &MarketReport, output_dir: &Path) -> Result<PathBuf> {
    let destination = market_report_path(output_dir, report.market());
    save_workbook(&layout_market_report(report)?, &destination)?;
    Ok(destination)
}

pub fn export_mx_report(report: &MxReport, output_dir: &Path) -> Result<PathBuf> {
    let destination = mx_report_path(output_dir, report.mode);
    save_workbook(&layout_mx_report(report)?, &destination)?;
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Metric;
    use crate::merge::merge_metrics;
    use crate::table::MxSheet;

    fn table(rows: &[(&str, f64)]) -> MetricTable {
        MetricTable::from_rows(rows.iter().map(|(d, v)| (d.to_string(), *v))).unwrap()
    }

    fn text(layout: &SheetLayout, row: u32, col: u16) -> Option<String> {
        match layout.cell(row, col).map(|c| &c.value) {
            Some(CellValue::Text(t)) => Some(t.clone()),
            _ => None,
        }
    }

    fn number(layout: &SheetLayout, row: u32, col: u16) -> Option<f64> {
        match layout.cell(row, col).map(|c| &c.value) {
            Some(CellValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    fn sample_report() -> MarketReport {
        merge_metrics(
            Market::Arg,
            vec![
                (Metric::Volume, table(&[("2024-03-01", 12.5)])),
                (Metric::Transactions, table(&[("2024-03-02", 4.0)])),
            ],
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn market_layout_has_header_and_rows() {
        let sheets = layout_market_report(&sample_report()).unwrap();
        assert_eq!(sheets.len(), 1);
        let layout = &sheets[0];
        assert_eq!(text(layout, 0, 0).as_deref(), Some("Día"));
        assert_eq!(text(layout, 0, 1).as_deref(), Some("volume"));
        assert_eq!(text(layout, 0, 2).as_deref(), Some("transactions"));
        assert_eq!(text(layout, 1, 0).as_deref(), Some("2024-03-01"));
        assert_eq!(number(layout, 1, 1), Some(12.5));
        assert_eq!(number(layout, 2, 1), Some(0.0));
        assert_eq!(number(layout, 2, 2), Some(4.0));
    }

    #[test]
    fn mx_layout_places_blocks_side_by_side() {
        let report = MxReport {
            mode: MxMode::Precierre,
            segment_customer: 231013,
            sheets: vec![
                MxSheet {
                    metric: Metric::Volume,
                    total: table(&[("2024-05-01", 20.0)]),
                    segment: Some(table(&[("2024-05-01", 10.0)])),
                    segment_by_product: Some(
                        ProductTable::from_rows(vec![(
                            ("2024-05-01".to_string(), "SKU1".to_string()),
                            10.0,
                        )])
                        .unwrap(),
                    ),
                },
                MxSheet {
                    metric: Metric::Revenue,
                    total: table(&[("2024-05-01", 3.0)]),
                    segment: None,
                    segment_by_product: None,
                },
            ],
        };

        let sheets = layout_mx_report(&report).unwrap();
        assert_eq!(sheets.len(), 2);

        let volume = &sheets[0];
        assert_eq!(volume.name, "Volume");
        assert!(volume.cell(0, 0).unwrap().bold);
        assert_eq!(text(volume, 0, 0).as_deref(), Some("Venta Total"));
        assert_eq!(text(volume, 0, 5).as_deref(), Some("Filtro 231013"));
        assert_eq!(text(volume, 0, 10).as_deref(), Some("Filtro 231013 por SKU"));
        assert_eq!(text(volume, 1, 11).as_deref(), Some("SKU"));
        assert_eq!(number(volume, 2, 1), Some(20.0));
        assert_eq!(number(volume, 2, 6), Some(10.0));
        assert_eq!(number(volume, 2, 12), Some(10.0));

        let revenue = &sheets[1];
        assert!(revenue.cell(0, 5).is_none());
        assert!(revenue.cell(0, 10).is_none());
    }

    #[test]
    fn export_writes_complete_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_market_report(&sample_report(), dir.path()).unwrap();

        assert_eq!(path, dir.path().join("validation_report_ARG.xlsx"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn export_replaces_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = market_report_path(dir.path(), Market::Arg);
        fs::write(&path, b"stale").unwrap();

        export_market_report(&sample_report(), dir.path()).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_relocation_keeps_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = NamedTempFile::new_in(dir.path()).unwrap();
        fs::write(scratch.path(), b"workbook").unwrap();
        let destination = dir.path().join("missing").join("report.xlsx");

        match relocate(scratch, &destination) {
            Err(ReportError::Export { scratch, .. }) => {
                assert_eq!(fs::read(&scratch).unwrap(), b"workbook");
            }
            other => panic!("expected export failure, got {other:?}"),
        }
    }

    #[test]
    fn mx_report_path_uses_mode() {
        assert_eq!(
            mx_report_path(Path::new("Output"), MxMode::Completo),
            PathBuf::from("Output/validation_MX_completo.xlsx")
        );
    }
}
