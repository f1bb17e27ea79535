/// Column-name constants for the typed tables.
/// Single source of truth for the chunk frames, metric tables and reports.

// ── Raw chunk columns ───────────────────────────────────────────────────────
pub mod raw {
    pub const DATE: &str = "date";
    pub const CUSTOMER: &str = "customer";
    pub const PRODUCT: &str = "product";
    pub const VALUE: &str = "value";

    /// Positional fields of a headerless sales record.
    pub const DATE_FIELD: usize = 0;
    pub const CUSTOMER_FIELD: usize = 2;
    pub const PRODUCT_FIELD: usize = 3;
}

// ── Metric table columns ────────────────────────────────────────────────────
pub mod metric_table {
    pub const DATE: &str = "date";
    pub const PRODUCT: &str = "product";
    pub const VALUE: &str = "value";
}

// ── Two-part additive join ──────────────────────────────────────────────────
pub mod additive {
    pub const LEFT_VALUE: &str = "value_part_a";
    pub const RIGHT_VALUE: &str = "value_part_b";
}

// ── Markers read as missing ─────────────────────────────────────────────────
pub mod na {
    /// Field texts treated as null, matching the usual CSV-tool defaults.
    pub const MARKERS: [&str; 19] = [
        "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
        "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
    ];
}

// ── Spreadsheet headers ─────────────────────────────────────────────────────
pub mod sheet {
    pub const REPORT_SHEET: &str = "Report";
    pub const REPORT_DATE: &str = "Día";
    pub const DATE: &str = "Date";
    pub const SKU: &str = "SKU";
    pub const TOTAL_TITLE: &str = "Venta Total";
}
