//! Spreadsheet decoding and header inference.
//!
//! A sheet is flattened to a grid of display strings (first worksheet only),
//! the header row is located by keyword scoring, and every later non-blank
//! row is mapped to a [`ShipmentRaw`] through the declarative
//! [`COLUMN_RULES`] table.
//!
//! # Header detection
//!
//! Each of the first `header_scan_rows` rows is scored against
//! [`HEADER_HINTS`]: a hint counts once if any cell in the row contains it
//! (case-insensitive). The first row scoring at least `min_header_score`
//! is the header. Column order does not matter.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, Utc};
use loadboard_config::SpreadsheetConfig;
use loadboard_core::coerce::{coerce_date, coerce_decimal, coerce_int, coerce_money};
use loadboard_core::ShipmentRaw;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SourceError;

pub type Grid = Vec<Vec<String>>;

/// Column-name fragments expected in the header row.
pub const HEADER_HINTS: [&str; 10] = [
    "fecha", "albar", "remit", "consig", "dest", "bult", "kg", "portes", "iva", "total",
];

// ---------------------------------------------------------------------------
// Column rules
// ---------------------------------------------------------------------------

/// Where one logical field lives in the sheet.
///
/// `include` fragments are tried in order; for each, the first header cell
/// containing it (and none of `exclude`) wins.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub field: SheetField,
    pub include: &'static [&'static str],
    pub exclude: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetField {
    Id,
    ShippedOn,
    OriginOffice,
    DestCity,
    Remitter,
    Consignee,
    Pieces,
    WeightKg,
    Freight,
    Reshipment,
    CodAmount,
    CodFee,
    Clearance,
    Insurance,
    Vat,
    Total,
    PaymentType,
}

const fn rule(
    field: SheetField,
    include: &'static [&'static str],
    exclude: &'static [&'static str],
) -> ColumnRule {
    ColumnRule {
        field,
        include,
        exclude,
    }
}

pub const COLUMN_RULES: &[ColumnRule] = &[
    rule(SheetField::Id, &["albar", "nº", "num", "id"], &[]),
    rule(SheetField::ShippedOn, &["fecha"], &[]),
    rule(SheetField::OriginOffice, &["exp.ori", "exp ori", "expori", "ori"], &["reexp"]),
    rule(SheetField::DestCity, &["destino", "dest", "pobl"], &[]),
    rule(SheetField::Remitter, &["remit"], &[]),
    rule(SheetField::Consignee, &["consig"], &[]),
    rule(SheetField::Pieces, &["bult", "pzs", "pieces"], &[]),
    rule(SheetField::WeightKg, &["kg", "kilo", "peso"], &[]),
    rule(SheetField::Freight, &["portes"], &[]),
    rule(SheetField::Reshipment, &["reexp"], &[]),
    rule(SheetField::CodAmount, &["reemb"], &["g.", "g ", "gastos"]),
    rule(SheetField::CodFee, &["g.reem", "g. reem", "g reem", "gastos"], &[]),
    rule(SheetField::Clearance, &["desemb"], &[]),
    rule(SheetField::Insurance, &["seguro"], &[]),
    rule(SheetField::Vat, &["iva"], &[]),
    rule(SheetField::Total, &["total"], &[]),
    rule(SheetField::PaymentType, &["p/d", "tipo", "pago", "forma"], &[]),
];

impl ColumnRule {
    /// Index of the matching header cell. `headers` must already be lowercase.
    pub fn locate(&self, headers: &[String]) -> Option<usize> {
        self.include.iter().find_map(|needle| {
            headers.iter().position(|h| {
                h.contains(needle) && !self.exclude.iter().any(|x| h.contains(x))
            })
        })
    }
}

/// Column index per field, resolved once from the header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: Vec<(SheetField, usize)>,
}

impl ColumnMap {
    pub fn from_header(header: &[String]) -> Self {
        let lowered: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let columns = COLUMN_RULES
            .iter()
            .filter_map(|r| r.locate(&lowered).map(|idx| (r.field, idx)))
            .collect();
        Self { columns }
    }

    pub fn column(&self, field: SheetField) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    }

    fn cell<'r>(&self, row: &'r [String], field: SheetField) -> Option<&'r str> {
        self.column(field)
            .and_then(|idx| row.get(idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

pub fn header_score(row: &[String]) -> usize {
    let lowered: Vec<String> = row.iter().map(|c| c.to_lowercase()).collect();
    HEADER_HINTS
        .iter()
        .filter(|hint| lowered.iter().any(|cell| cell.contains(*hint)))
        .count()
}

/// Index of the first qualifying header row within the scan window.
pub fn detect_header(grid: &[Vec<String>], scan_rows: usize, min_score: usize) -> Option<usize> {
    grid.iter()
        .take(scan_rows)
        .position(|row| header_score(row) >= min_score)
}

fn best_score(grid: &[Vec<String>], scan_rows: usize) -> usize {
    grid.iter()
        .take(scan_rows)
        .map(|row| header_score(row))
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Map one data row. Rows without an identifier yield `None`.
pub fn map_row(
    row: &[String],
    columns: &ColumnMap,
    config: &SpreadsheetConfig,
    now: DateTime<Utc>,
) -> Option<ShipmentRaw> {
    let id = columns.cell(row, SheetField::Id)?;

    let mut raw = ShipmentRaw::new()
        .with("id", id)
        .with("origin_country", config.default_country.as_str())
        .with("dest_country", config.default_country.as_str())
        .with("carrier", config.default_carrier.as_str())
        .with("status", "Delivered");

    if let Some(date) = columns.cell(row, SheetField::ShippedOn) {
        let ts = coerce_date(date, now);
        raw.insert("fecha", ts.clone());
        raw.insert("last_seen", ts);
    }
    if let Some(office) = columns.cell(row, SheetField::OriginOffice) {
        raw.insert("exp_ori", office);
        raw.insert("origin_city", office);
    }

    let pieces = columns
        .cell(row, SheetField::Pieces)
        .and_then(coerce_int)
        .unwrap_or(1);
    let weight = columns
        .cell(row, SheetField::WeightKg)
        .and_then(coerce_decimal)
        .unwrap_or(0.0);
    raw.insert("pieces", pieces);
    raw.insert("weight_kg", Value::from(weight));

    const TEXT_FIELDS: [(SheetField, &str); 3] = [
        (SheetField::DestCity, "dest_city"),
        (SheetField::Remitter, "remitente"),
        (SheetField::Consignee, "consignatario"),
    ];
    for (field, key) in TEXT_FIELDS {
        if let Some(value) = columns.cell(row, field) {
            raw.insert(key, value);
        }
    }

    // Imported JSON carries amounts, not cell text; an unreadable cell is null.
    const MONEY_FIELDS: [(SheetField, &str); 8] = [
        (SheetField::Freight, "portes"),
        (SheetField::Reshipment, "reexp"),
        (SheetField::CodAmount, "reemb"),
        (SheetField::CodFee, "g_reem"),
        (SheetField::Clearance, "desemb"),
        (SheetField::Insurance, "seguro"),
        (SheetField::Vat, "iva"),
        (SheetField::Total, "total"),
    ];
    for (field, key) in MONEY_FIELDS {
        if let Some(cell) = columns.cell(row, field) {
            raw.insert(key, coerce_money(cell).map_or(Value::Null, Value::from));
        }
    }

    if let Some(tag) = columns.cell(row, SheetField::PaymentType) {
        raw.insert("payment_type", tag.to_uppercase());
    }

    Some(raw)
}

/// Header detection plus row mapping. No qualifying header gives an empty result.
pub fn map_grid(grid: &[Vec<String>], config: &SpreadsheetConfig, now: DateTime<Utc>) -> Vec<ShipmentRaw> {
    let Some(header_idx) = detect_header(grid, config.header_scan_rows, config.min_header_score) else {
        return Vec::new();
    };
    let columns = ColumnMap::from_header(&grid[header_idx]);
    debug!(row = header_idx, columns = columns.columns.len(), "header row detected");

    let mut records = Vec::new();
    for (offset, row) in grid[header_idx + 1..].iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        match map_row(row, &columns, config, now) {
            Some(raw) => records.push(raw),
            None => warn!(row = header_idx + 1 + offset, "skipping spreadsheet row without an identifier"),
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn is_delimited(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".csv") || path.ends_with(".tsv") || path.ends_with(".txt")
}

/// Decode bytes to a grid, by extension: delimited text or a workbook.
pub fn decode_grid(bytes: &[u8], location: &str) -> Result<Grid, SourceError> {
    if is_delimited(location) {
        decode_delimited(bytes)
    } else {
        decode_workbook(bytes)
    }
}

/// First worksheet of an xlsx/xls/xlsb/ods workbook.
pub fn decode_workbook(bytes: &[u8]) -> Result<Grid, SourceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(SourceError::NoSheets)??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        // Serial day number; date coercion understands these.
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Delimited text (CSV/TSV/semicolon), UTF-8 or Windows-1252.
pub fn decode_delimited(bytes: &[u8]) -> Result<Grid, SourceError> {
    let content = decode_text(bytes);
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

/// UTF-8 first; on failure fall back to Windows-1252 (Excel-exported CSVs).
fn decode_text(bytes: &[u8]) -> String {
    let bytes = crate::json::strip_bom(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Lines sampled when guessing the separator. Enough to get past the title
/// block above the header and into the delivery-note rows.
const SNIFF_LINES: usize = 20;

/// Guess the field separator of an exported delivery-note listing.
///
/// Spanish exports separate with `;` because `,` is the decimal mark, so a
/// comma split cuts every amount (`10,50`) in two and the width drifts from
/// row to row. Title lines above the header have one field under any
/// separator and are ignored. The winner is the separator under which the
/// most lines agree on one width; a wider agreement breaks ties. Falls back
/// to `,` when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b';', b'\t', b',', b'|'];

    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = (b',', (0usize, 0usize));
    for delim in CANDIDATES {
        let mut agreement: HashMap<usize, usize> = HashMap::new();
        for line in &sample {
            let width = field_count(line, delim);
            if width > 1 {
                *agreement.entry(width).or_default() += 1;
            }
        }
        // (lines agreeing, width) for the best-supported width
        let Some(score) = agreement.into_iter().map(|(width, lines)| (lines, width)).max() else {
            continue;
        };
        if score > best.1 {
            best = (delim, score);
        }
    }

    best.0
}

/// Fields in one line under `delim`, honouring quotes.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map_or(1, |r| r.len())
}

/// Decode, detect the header and map rows. Fails when no header qualifies
/// or no row carries an identifier.
pub fn parse_spreadsheet(
    bytes: &[u8],
    location: &str,
    config: &SpreadsheetConfig,
    now: DateTime<Utc>,
) -> Result<Vec<ShipmentRaw>, SourceError> {
    let grid = decode_grid(bytes, location)?;
    if detect_header(&grid, config.header_scan_rows, config.min_header_score).is_none() {
        return Err(SourceError::NoHeader {
            scanned: grid.len().min(config.header_scan_rows),
            best: best_score(&grid, config.header_scan_rows),
            needed: config.min_header_score,
        });
    }
    let records = map_grid(&grid, config, now);
    if records.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loadboard_config::MAX_HEADER_SCORE;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn header() -> Vec<String> {
        row(&[
            "Fecha", "Nº Albarán", "Exp.Ori", "Destino", "Remitente", "Consignatario", "Bultos",
            "Kg", "Portes", "Reexp", "Reemb", "G. Reemb", "Desemb", "Seguro", "IVA", "Total", "P/D",
        ])
    }

    fn data_row() -> Vec<String> {
        row(&[
            "05/03/2024", "1001", "Valencia", "Sevilla", "Colchones SA", "Hotel Sol", "3", "25,5",
            "10,50", "", "100,00", "2,00", "", "1,00", "2,10", "12,60", "p",
        ])
    }

    #[test]
    fn hint_count_matches_score_ceiling() {
        assert_eq!(HEADER_HINTS.len(), MAX_HEADER_SCORE);
    }

    #[test]
    fn header_in_row_zero_is_selected() {
        let grid = vec![
            row(&["FECHA", "ALBARAN", "REMITENTE", "CONSIGNATARIO", "DESTINO"]),
            row(&["05/03/2024", "1001", "A", "B", "C"]),
        ];
        assert_eq!(header_score(&grid[0]), 5);
        assert_eq!(detect_header(&grid, 50, 5), Some(0));
    }

    #[test]
    fn header_below_title_rows() {
        let mut grid = vec![row(&["Europillow - listado"]), row(&[]), row(&["total 2025"])];
        grid.push(header());
        grid.push(data_row());
        assert_eq!(detect_header(&grid, 50, 5), Some(3));
    }

    #[test]
    fn no_qualifying_row_maps_to_nothing() {
        let grid = vec![
            row(&["fecha", "albar", "remit", "consig"]),
            row(&["x", "y"]),
        ];
        assert_eq!(detect_header(&grid, 50, 5), None);
        assert!(map_grid(&grid, &SpreadsheetConfig::default(), now()).is_empty());
    }

    #[test]
    fn header_outside_scan_window_is_ignored() {
        let mut grid: Grid = (0..3).map(|_| row(&["filler"])).collect();
        grid.push(header());
        assert_eq!(detect_header(&grid, 3, 5), None);
        assert_eq!(detect_header(&grid, 4, 5), Some(3));
    }

    #[test]
    fn hint_counts_once_per_row() {
        let r = row(&["total", "total portes", "subtotal"]);
        assert_eq!(header_score(&r), 2); // "total" + "portes"
    }

    #[test]
    fn column_rules_pick_expected_cells() {
        let columns = ColumnMap::from_header(&header());
        assert_eq!(columns.column(SheetField::Id), Some(1));
        assert_eq!(columns.column(SheetField::OriginOffice), Some(2));
        assert_eq!(columns.column(SheetField::DestCity), Some(3));
        assert_eq!(columns.column(SheetField::Reshipment), Some(9));
        assert_eq!(columns.column(SheetField::CodAmount), Some(10));
        assert_eq!(columns.column(SheetField::CodFee), Some(11));
        assert_eq!(columns.column(SheetField::PaymentType), Some(16));
    }

    #[test]
    fn include_order_beats_column_order() {
        // "id" appears first, but "albar" is the preferred fragment.
        let columns = ColumnMap::from_header(&row(&["ID interno", "Albarán"]));
        assert_eq!(columns.column(SheetField::Id), Some(1));
    }

    #[test]
    fn exclusions_skip_cells() {
        let columns = ColumnMap::from_header(&row(&["Reexp. Origen", "Origen"]));
        assert_eq!(columns.column(SheetField::OriginOffice), Some(1));
        let columns = ColumnMap::from_header(&row(&["G. Reemb"]));
        assert_eq!(columns.column(SheetField::CodAmount), None);
        assert_eq!(columns.column(SheetField::CodFee), Some(0));
    }

    #[test]
    fn row_mapping_fills_defaults() {
        let columns = ColumnMap::from_header(&header());
        let raw = map_row(&data_row(), &columns, &SpreadsheetConfig::default(), now()).unwrap();

        assert_eq!(raw.text(&["id"]).as_deref(), Some("1001"));
        assert_eq!(raw.text(&["origin_city"]).as_deref(), Some("Valencia"));
        assert_eq!(raw.text(&["dest_city"]).as_deref(), Some("Sevilla"));
        assert_eq!(raw.text(&["origin_country"]).as_deref(), Some("ES"));
        assert_eq!(raw.text(&["dest_country"]).as_deref(), Some("ES"));
        assert_eq!(raw.text(&["carrier"]).as_deref(), Some("Europillow"));
        assert_eq!(raw.text(&["status"]).as_deref(), Some("Delivered"));
        assert_eq!(raw.text(&["fecha"]).as_deref(), Some("2024-03-05T00:00:00.000Z"));
        assert_eq!(raw.text(&["last_seen"]).as_deref(), Some("2024-03-05T00:00:00.000Z"));
        assert_eq!(raw.text(&["pieces"]).as_deref(), Some("3"));
        assert_eq!(raw.text(&["weight_kg"]).as_deref(), Some("25.5"));
        assert_eq!(raw.get(&["portes"]), Some(&Value::from(10.5)));
        assert_eq!(raw.get(&["g_reem"]), Some(&Value::from(2.0)));
        assert_eq!(raw.text(&["payment_type"]).as_deref(), Some("P"));
        assert_eq!(raw.get(&["reexp"]), None);
    }

    #[test]
    fn money_cells_become_amounts() {
        let columns = ColumnMap::from_header(&row(&["Albarán", "Portes", "IVA", "Total", "Seguro"]));
        let raw = map_row(
            &row(&["7", "1.234,56 €", "21.5", "pendiente", ""]),
            &columns,
            &SpreadsheetConfig::default(),
            now(),
        )
        .unwrap();

        assert_eq!(raw.get(&["portes"]), Some(&Value::from(1234.56)));
        assert_eq!(raw.get(&["iva"]), Some(&Value::from(21.5)));
        assert_eq!(raw.fields().get("total"), Some(&Value::Null));
        assert!(!raw.fields().contains_key("seguro"));

        let record = loadboard_core::normalize(&raw);
        assert_eq!(record.freight, Some(1234.56));
        assert_eq!(record.total, None);
    }

    #[test]
    fn missing_pieces_and_weight_default() {
        let columns = ColumnMap::from_header(&row(&["Albarán", "Bultos", "Kg"]));
        let raw = map_row(&row(&["7", "", "n/a"]), &columns, &SpreadsheetConfig::default(), now()).unwrap();
        assert_eq!(raw.text(&["pieces"]).as_deref(), Some("1"));
        assert_eq!(raw.get(&["weight_kg"]).and_then(Value::as_f64), Some(0.0));
    }

    #[test]
    fn configured_defaults_are_used() {
        let config = SpreadsheetConfig {
            default_country: "PT".into(),
            default_carrier: "Own fleet".into(),
            ..SpreadsheetConfig::default()
        };
        let columns = ColumnMap::from_header(&row(&["Albarán"]));
        let raw = map_row(&row(&["9"]), &columns, &config, now()).unwrap();
        assert_eq!(raw.text(&["origin_country"]).as_deref(), Some("PT"));
        assert_eq!(raw.text(&["carrier"]).as_deref(), Some("Own fleet"));
    }

    #[test]
    fn blank_and_id_less_rows_are_skipped() {
        let grid = vec![header(), data_row(), row(&["", "", ""]), row(&["05/03/2024", "", "Madrid"])];
        let records = map_grid(&grid, &SpreadsheetConfig::default(), now());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn csv_with_semicolons_and_latin1() {
        let mut bytes = b"Fecha;Albar\xe1n;Remitente;Consignatario;Destino;Bultos;Kg;Portes;IVA;Total\n".to_vec();
        bytes.extend_from_slice(b"45356;1001;A;B;C\xe1diz;2;10;5,00;1,00;6,00\n");

        let grid = decode_grid(&bytes, "export.CSV").unwrap();
        assert_eq!(grid[0][1], "Albarán");
        assert_eq!(grid[1][4], "Cádiz");

        let records = parse_spreadsheet(&bytes, "export.csv", &SpreadsheetConfig::default(), now()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(&["fecha"]).as_deref(), Some("2024-03-05T00:00:00.000Z"));
    }

    #[test]
    fn sniffs_tabs_and_commas() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn semicolon_listing_with_decimal_commas() {
        let listing = "Listado de albaranes\n\
                       Fecha;Albarán;Portes;IVA;Total\n\
                       05/03/2024;A1;10,50;2,10;12,60\n\
                       06/03/2024;A2;5;1,05;6,05\n";
        assert_eq!(sniff_delimiter(listing), b';');

        let grid = decode_delimited(listing.as_bytes()).unwrap();
        assert_eq!(grid[1][1], "Albarán");
        assert_eq!(grid[2][2], "10,50");
    }

    #[test]
    fn no_header_error_reports_best_score() {
        let bytes = b"fecha,albar\n1,2\n";
        let err = parse_spreadsheet(bytes, "a.csv", &SpreadsheetConfig::default(), now()).unwrap_err();
        match err {
            SourceError::NoHeader { best, needed, .. } => {
                assert_eq!(best, 2);
                assert_eq!(needed, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        assert!(decode_grid(b"not a workbook", "shipments.xlsx").is_err());
    }
}
