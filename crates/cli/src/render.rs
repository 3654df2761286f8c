//! Text rendering for the board: summary cards, finance header, table.
//!
//! All functions return strings; printing happens in the command handlers.

use loadboard_core::format::{fmt_int, fmt_kg, fmt_money, format_date_time};
use loadboard_core::{BoardView, PaymentBucket, PaymentSummary, ShipmentNormalized, ShipmentStats};
use unicode_width::UnicodeWidthStr;

const GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Fixed-width text table. Widths are measured in terminal columns.
struct Table {
    columns: Vec<(&'static str, Align)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(columns: Vec<(&'static str, Align)>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, (title, _))| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|cell| cell.width())
                    .chain(std::iter::once(title.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn render(&self) -> String {
        let widths = self.widths();
        let titles: Vec<String> = self.columns.iter().map(|(t, _)| t.to_string()).collect();

        let mut out = String::new();
        for row in std::iter::once(&titles).chain(self.rows.iter()) {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, ((_, align), width))| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    pad(cell, *width, *align)
                })
                .collect();
            out.push_str(cells.join(GAP).trim_end());
            out.push('\n');
        }
        out
    }
}

fn pad(cell: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(cell.width()));
    match align {
        Align::Left => format!("{cell}{fill}"),
        Align::Right => format!("{fill}{cell}"),
    }
}

fn opt_int(n: Option<i64>) -> String {
    n.map(fmt_int).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

pub fn stats_line(stats: &ShipmentStats) -> String {
    format!(
        "Shipments: {}   Delivered: {}   In transit / OFD: {}   Pieces: {}   Weight: {}",
        fmt_int(stats.total as i64),
        fmt_int(stats.delivered as i64),
        fmt_int(stats.in_transit as i64),
        fmt_int(stats.total_pieces),
        fmt_kg(Some(stats.total_weight)),
    )
}

pub fn payment_table(summary: &PaymentSummary) -> String {
    let mut table = Table::new(vec![
        ("", Align::Left),
        ("Paid", Align::Right),
        ("Due", Align::Right),
        ("Totals", Align::Right),
    ]);

    let buckets = [&summary.paid, &summary.due, &summary.totals];
    let line = |label: &str, cell: fn(&PaymentBucket) -> String| {
        std::iter::once(label.to_string())
            .chain(buckets.iter().map(|b| cell(b)))
            .collect::<Vec<_>>()
    };

    table.push(line("Pieces", |b| fmt_int(b.pieces)));
    table.push(line("Weight", |b| fmt_kg(Some(b.kg))));
    table.push(line("Portes", |b| fmt_money(Some(b.freight()))));
    table.push(line("IVA", |b| fmt_money(Some(b.vat()))));
    table.push(line("Total", |b| fmt_money(Some(b.total()))));
    table.push(line("Count", |b| fmt_int(b.count as i64)));
    table.render()
}

// ---------------------------------------------------------------------------
// Shipment table
// ---------------------------------------------------------------------------

pub fn shipment_table(rows: &[&ShipmentNormalized]) -> String {
    let mut table = Table::new(vec![
        ("ID", Align::Left),
        ("Origin", Align::Left),
        ("Destination", Align::Left),
        ("Remitter", Align::Left),
        ("Consignee", Align::Left),
        ("Status", Align::Left),
        ("Pieces", Align::Right),
        ("Weight", Align::Right),
        ("Portes", Align::Right),
        ("IVA", Align::Right),
        ("Total", Align::Right),
        ("P/D", Align::Left),
        ("Carrier", Align::Left),
        ("Last seen", Align::Left),
    ]);

    for r in rows {
        table.push(vec![
            r.id.clone(),
            r.origin_city.clone(),
            r.dest_city.clone(),
            r.remitter.clone(),
            r.consignee.clone(),
            r.status.to_string(),
            opt_int(r.pieces),
            fmt_kg(r.weight_kg),
            fmt_money(r.freight),
            fmt_money(r.vat),
            fmt_money(r.total),
            r.payment_type.clone(),
            r.carrier.clone(),
            format_date_time(r.last_seen.as_deref()),
        ]);
    }
    table.render()
}

/// Cards, finance header, table and footer for one board view.
pub fn board(description: &str, view: &BoardView<'_>) -> String {
    let mut out = String::new();
    out.push_str(description);
    out.push_str("\n\n");
    out.push_str(&stats_line(&view.stats));
    out.push_str("\n\n");
    out.push_str(&payment_table(&view.payments));
    out.push('\n');
    if view.rows.is_empty() {
        out.push_str("No shipments match.\n");
    } else {
        out.push_str(&shipment_table(&view.rows));
    }
    out.push_str(&format!("\nShowing {} of {}\n", view.showing, view.total));
    out
}

/// Cards and finance header only.
pub fn summary(description: &str, stats: &ShipmentStats, payments: &PaymentSummary) -> String {
    format!(
        "{description}\n\n{}\n\n{}",
        stats_line(stats),
        payment_table(payments)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadboard_core::{BoardQuery, Loadboard, ShipmentRaw};
    use serde_json::json;

    fn board_fixture() -> Loadboard {
        let raw: Vec<ShipmentRaw> = serde_json::from_value(json!([
            {"id": "A1", "status": "Delivered", "pieces": 3, "weight_kg": 10, "payment_type": "P",
             "portes": "10,50", "iva": "2,10", "total": "12,60", "origin_city": "Valencia"},
            {"id": "A2", "status": "In Transit", "pieces": 2, "weight_kg": 5, "payment_type": "D",
             "portes": "5,00", "iva": "1,00", "total": "6,00", "origin_city": "Cádiz"}
        ]))
        .unwrap();
        Loadboard::from_raw(&raw)
    }

    #[test]
    fn stats_line_uses_spanish_formatting() {
        let line = stats_line(&board_fixture().stats());
        assert_eq!(
            line,
            "Shipments: 2   Delivered: 1   In transit / OFD: 1   Pieces: 5   Weight: 15 kg"
        );
    }

    #[test]
    fn payment_table_columns_line_up() {
        let text = payment_table(&board_fixture().payments());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].ends_with("Paid     Due   Totals"));
        assert!(lines[3].starts_with("Portes"));
        assert!(lines[3].ends_with("10,50 €  5,00 €  15,50 €"));
        assert!(lines[5].ends_with("12,60 €  6,00 €  18,60 €"));
    }

    #[test]
    fn table_pads_by_display_width() {
        let b = board_fixture();
        let view = b.view(&BoardQuery::default());
        let text = shipment_table(&view.rows);
        let lines: Vec<&str> = text.lines().collect();
        // "Cádiz" is wider in bytes than in columns.
        let status_col = |line: &str| {
            let idx = line
                .find("Delivered")
                .or_else(|| line.find("In Transit"))
                .unwrap();
            line[..idx].width()
        };
        assert_eq!(status_col(lines[1]), status_col(lines[2]));
    }

    #[test]
    fn board_reports_showing_count() {
        let b = board_fixture();
        let view = b.view(&BoardQuery::default().search("a1"));
        let text = board("2 records from test", &view);
        assert!(text.starts_with("2 records from test\n"));
        assert!(text.contains("Showing 1 of 2"));
        assert!(text.contains("A1"));
        assert!(!text.contains("A2"));
    }

    #[test]
    fn empty_view_says_so() {
        let b = board_fixture();
        let view = b.view(&BoardQuery::default().search("nothing like this"));
        assert!(board("x", &view).contains("No shipments match."));
    }
}
