//! CSV ingestion: source selection, header cleanup and per-field coercion into typed orders.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ckd_core::{ColumnKind, Diagnostic, OrderColumn, OrderRecord, ParamValue};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "ckd-ingest";

/// Cells that count as missing, whatever the column kind.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// CSV content handed in by a caller, e.g. an HTTP upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Hex SHA-256 of the content.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSource<'a> {
    Upload(&'a Upload),
    Path(PathBuf),
}

impl OrderSource<'_> {
    /// Stable identity of the source, suitable as a cache key.
    pub fn key(&self) -> String {
        match self {
            OrderSource::Upload(upload) => format!("upload:{}", upload.fingerprint()),
            OrderSource::Path(path) => format!("path:{}", path.display()),
        }
    }
}

/// An upload always wins over the default path; a path that does not exist is unusable.
pub fn resolve_source<'a>(upload: Option<&'a Upload>, default_path: Option<&Path>) -> Option<OrderSource<'a>> {
    if let Some(upload) = upload {
        return Some(OrderSource::Upload(upload));
    }
    default_path
        .filter(|p| p.is_file())
        .map(|p| OrderSource::Path(p.to_path_buf()))
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed CSV: expected {expected} fields in line {line}, saw {found}")]
    ExtraFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Parsed table before it is wrapped with a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderTable {
    /// Normalized headers in file order, including ones that map to no known column.
    pub columns: Vec<String>,
    pub records: Vec<OrderRecord>,
}

/// Outcome of a load at the component boundary: a table, possibly empty, plus what to tell the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: OrderTable,
    pub diagnostic: Diagnostic,
}

impl LoadReport {
    pub fn empty(diagnostic: Diagnostic) -> Self {
        Self {
            table: OrderTable::default(),
            diagnostic,
        }
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.table.records
    }

    pub fn is_empty(&self) -> bool {
        self.table.records.is_empty()
    }
}

/// Load orders from the preferred source. Never fails: errors become an empty table
/// with an error diagnostic.
pub fn load_orders(upload: Option<&Upload>, default_path: Option<&Path>) -> LoadReport {
    let Some(source) = resolve_source(upload, default_path) else {
        let wanted = default_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "order.csv".to_string());
        let diagnostic = Diagnostic::warning(format!(
            "No CSV file found. Please upload a file or ensure '{wanted}' exists."
        ));
        warn!(%diagnostic, "no usable order source");
        return LoadReport::empty(diagnostic);
    };
    load_from_source(&source)
}

pub fn load_from_source(source: &OrderSource<'_>) -> LoadReport {
    let parsed = match source {
        OrderSource::Upload(upload) => read_orders(upload.bytes.as_slice()),
        OrderSource::Path(path) => File::open(path)
            .map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })
            .and_then(read_orders),
    };

    match parsed {
        Ok(table) => {
            info!(source = %source.key(), rows = table.records.len(), "loaded order csv");
            let diagnostic = match source {
                OrderSource::Upload(upload) => {
                    Diagnostic::success(format!("Uploaded file loaded: {}", upload.name))
                }
                OrderSource::Path(path) => {
                    Diagnostic::info(format!("Using local file: {}", path.display()))
                }
            };
            LoadReport { table, diagnostic }
        }
        Err(err) => {
            warn!(source = %source.key(), error = %err, "order csv load failed");
            LoadReport::empty(Diagnostic::error(format!("Error loading CSV: {err}")))
        }
    }
}

/// Parse CSV content with a header row into typed orders. Short rows leave the
/// missing columns null; a row longer than the header fails the whole parse.
pub fn read_orders<R: Read>(reader: R) -> Result<OrderTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect::<Vec<_>>();

    let mut mapping: Vec<Option<OrderColumn>> = Vec::with_capacity(columns.len());
    for header in &columns {
        let column = OrderColumn::from_header(header)
            .filter(|c| !mapping.contains(&Some(*c)));
        mapping.push(column);
    }

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        if row.len() > columns.len() {
            return Err(IngestError::ExtraFields {
                line: row.position().map(|p| p.line()).unwrap_or_default(),
                expected: columns.len(),
                found: row.len(),
            });
        }
        let mut record = OrderRecord::default();
        for (cell, column) in row.iter().zip(mapping.iter()) {
            if let Some(column) = column {
                record.set_param(*column, coerce_field(*column, cell));
            }
        }
        records.push(record);
    }

    Ok(OrderTable { columns, records })
}

/// Strip surrounding whitespace, quote characters and a byte-order mark.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .replace('"', "")
        .trim()
        .to_string()
}

/// Exact match; a whitespace-only cell is a value, not a missing one.
pub fn is_na_token(cell: &str) -> bool {
    NA_TOKENS.contains(&cell)
}

/// Malformed cells become null for their kind; nothing here fails.
pub fn coerce_field(column: OrderColumn, cell: &str) -> ParamValue {
    if is_na_token(cell) {
        return ParamValue::null(column.kind());
    }
    match column.kind() {
        ColumnKind::Text => ParamValue::Text(Some(cell.to_string())),
        ColumnKind::Number => ParamValue::number(cell.trim().parse::<f64>().ok()),
        ColumnKind::Timestamp => {
            ParamValue::Timestamp(ckd_core::normalize_order_placed_at(cell))
        }
    }
}

/// Write orders back out as CSV with the destination headers.
pub fn write_orders_csv(records: &[OrderRecord]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(OrderColumn::ALL.iter().map(|c| c.header()))
        .context("writing csv header")?;
    for record in records {
        writer
            .write_record(OrderColumn::ALL.iter().map(|c| record.display_value(*c)))
            .context("writing csv row")?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing csv writer: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckd_core::DiagnosticLevel;
    use std::io::Write;

    const SAMPLE: &str = "\
 \"Restaurant name\" , Order ID ,Order Placed At,Order Status,Total,Rating,Unrelated
Biryani Box,A1,\"07:04 PM, September 01 2025\",Delivered,412.50,4
Wrap Co,A2,yesterday-ish,Cancelled,oops,
";

    #[test]
    fn headers_are_trimmed_and_unquoted() {
        assert_eq!(normalize_header("  \"Order ID\" "), "Order ID");
        assert_eq!(normalize_header("\u{feff}Restaurant ID"), "Restaurant ID");
    }

    #[test]
    fn rows_map_onto_typed_records() {
        let table = read_orders(SAMPLE.as_bytes()).expect("parse");
        assert_eq!(
            table.columns,
            vec!["Restaurant name", "Order ID", "Order Placed At", "Order Status", "Total", "Rating", "Unrelated"]
        );
        assert_eq!(table.records.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.order_id.as_deref(), Some("A1"));
        assert_eq!(first.restaurant_name.as_deref(), Some("Biryani Box"));
        assert_eq!(
            first.order_placed_at.map(|t| t.to_string()).as_deref(),
            Some("2025-09-01 19:04:00")
        );
        assert_eq!(first.total, Some(412.5));
        assert_eq!(first.rating, Some(4.0));
        assert_eq!(first.city, None);
    }

    #[test]
    fn malformed_fields_become_null_without_dropping_the_row() {
        let table = read_orders(SAMPLE.as_bytes()).expect("parse");
        let second = &table.records[1];
        assert_eq!(second.order_id.as_deref(), Some("A2"));
        assert_eq!(second.order_placed_at, None);
        assert_eq!(second.total, None);
        assert_eq!(second.rating, None);
    }

    #[test]
    fn na_tokens_are_null_for_every_kind() {
        assert_eq!(coerce_field(OrderColumn::Rating, "NaN"), ParamValue::Number(None));
        assert_eq!(coerce_field(OrderColumn::Rating, "inf"), ParamValue::Number(None));
        assert_eq!(coerce_field(OrderColumn::Review, "N/A"), ParamValue::Text(None));
        assert_eq!(coerce_field(OrderColumn::Review, ""), ParamValue::Text(None));
        assert_eq!(coerce_field(OrderColumn::OrderPlacedAt, "null"), ParamValue::Timestamp(None));
        assert_eq!(
            coerce_field(OrderColumn::Review, "Great food"),
            ParamValue::Text(Some("Great food".into()))
        );
    }

    #[test]
    fn whitespace_cells_are_values_not_na() {
        assert_eq!(
            coerce_field(OrderColumn::Instructions, "  "),
            ParamValue::Text(Some("  ".into()))
        );
        assert_eq!(coerce_field(OrderColumn::Review, " NA "), ParamValue::Text(Some(" NA ".into())));
        assert_eq!(coerce_field(OrderColumn::Total, "  "), ParamValue::Number(None));
        assert_eq!(coerce_field(OrderColumn::Total, " 12.5 "), ParamValue::Number(Some(12.5)));
    }

    #[test]
    fn short_rows_fill_missing_columns_with_null() {
        let table = read_orders("Order ID,Restaurant name,Total\nA1\nA2,Wrap Co,90\n".as_bytes())
            .expect("parse");
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].order_id.as_deref(), Some("A1"));
        assert_eq!(table.records[0].restaurant_name, None);
        assert_eq!(table.records[0].total, None);
        assert_eq!(table.records[1].total, Some(90.0));
    }

    #[test]
    fn rows_longer_than_the_header_fail_the_load() {
        let csv = "Order ID,Total\nA1,10\nA2,20,surplus\n";
        let err = read_orders(csv.as_bytes()).expect_err("extra field");
        assert!(matches!(err, IngestError::ExtraFields { line: 3, expected: 2, found: 3 }));

        let report = load_orders(Some(&Upload::new("ragged.csv", csv)), None);
        assert!(report.is_empty());
        assert!(report.diagnostic.is_error());
        assert!(report.diagnostic.message.contains("expected 2 fields in line 3, saw 3"));
    }

    #[test]
    fn upload_takes_precedence_over_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "Order ID\nP1").expect("write");

        let upload = Upload::new("orders.csv", "Order ID\nU1\nU2\n");
        let report = load_orders(Some(&upload), Some(file.path()));
        assert_eq!(report.diagnostic.level, DiagnosticLevel::Success);
        assert_eq!(report.records().len(), 2);
        assert_eq!(report.records()[0].order_id.as_deref(), Some("U1"));

        let from_path = load_orders(None, Some(file.path()));
        assert_eq!(from_path.diagnostic.level, DiagnosticLevel::Info);
        assert_eq!(from_path.records()[0].order_id.as_deref(), Some("P1"));
    }

    #[test]
    fn missing_source_yields_empty_table_with_warning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = load_orders(None, Some(&dir.path().join("order.csv")));
        assert!(report.is_empty());
        assert_eq!(report.diagnostic.level, DiagnosticLevel::Warning);
    }

    #[test]
    fn unreadable_csv_yields_empty_table_with_error() {
        let upload = Upload::new("broken.csv", vec![b'O', b'r', b'\n', 0xff, 0xfe, b'\n']);
        let report = load_orders(Some(&upload), None);
        assert!(report.is_empty());
        assert!(report.diagnostic.is_error());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = Upload::new("a.csv", "Order ID\nA1\n");
        let b = Upload::new("a.csv", "Order ID\nA2\n");
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(OrderSource::Upload(&a).key(), OrderSource::Upload(&b).key());
    }

    #[test]
    fn export_writes_destination_headers_and_blank_nulls() {
        let table = read_orders(SAMPLE.as_bytes()).expect("parse");
        let bytes = write_orders_csv(&table.records).expect("export");
        let text = String::from_utf8(bytes).expect("utf8");
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Restaurant ID,Restaurant name,Subzone,City,Order ID"));
        let reparsed = read_orders(text.as_bytes()).expect("reparse");
        assert_eq!(reparsed.records, table.records);
    }
}
