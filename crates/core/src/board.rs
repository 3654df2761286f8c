//! Board view layer.
//!
//! The board owns the normalized records of one load. Every query builds
//! a fresh view from them: status filter, then text search, then sort.
//! Nothing is mutated incrementally, so a view is a pure function of
//! (records, query).

use serde::Serialize;

use crate::aggregate::{compute_stats, payment_summary, PaymentSummary, ShipmentStats};
use crate::model::{ShipmentNormalized, ShipmentRaw, ShipmentStatus};
use crate::normalize::normalize_all;
use crate::search::{matches_text, prepare_query, SearchField, DEFAULT_SEARCH_FIELDS};
use crate::sort::{sort_by, SortDirection, SortField};

/// What the user currently has typed/selected.
#[derive(Debug, Clone, Default)]
pub struct BoardQuery {
    pub search: String,
    pub status: Option<ShipmentStatus>,
    pub sort: Option<(SortField, SortDirection)>,
}

impl BoardQuery {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn status(mut self, status: ShipmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sort(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some((field, direction));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Loadboard {
    records: Vec<ShipmentNormalized>,
    search_fields: Vec<SearchField>,
}

impl Loadboard {
    pub fn new(records: Vec<ShipmentNormalized>) -> Self {
        Self {
            records,
            search_fields: DEFAULT_SEARCH_FIELDS.to_vec(),
        }
    }

    /// Normalize a raw load (dropping id-less and totals rows).
    pub fn from_raw(raw: &[ShipmentRaw]) -> Self {
        Self::new(normalize_all(raw))
    }

    pub fn with_search_fields(mut self, fields: Vec<SearchField>) -> Self {
        if !fields.is_empty() {
            self.search_fields = fields;
        }
        self
    }

    pub fn records(&self) -> &[ShipmentNormalized] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> ShipmentStats {
        compute_stats(&self.records)
    }

    pub fn payments(&self) -> PaymentSummary {
        payment_summary(&self.records)
    }

    pub fn view(&self, query: &BoardQuery) -> BoardView<'_> {
        let needle = prepare_query(&query.search);

        let mut rows: Vec<&ShipmentNormalized> = self
            .records
            .iter()
            .filter(|r| query.status.as_ref().map_or(true, |s| &r.status == s))
            .filter(|r| {
                needle
                    .as_deref()
                    .map_or(true, |n| matches_text(r, n, &self.search_fields))
            })
            .collect();

        if let Some((field, direction)) = query.sort {
            sort_by(&mut rows, field, direction);
        }

        BoardView {
            total: self.records.len(),
            showing: rows.len(),
            stats: self.stats(),
            payments: self.payments(),
            rows,
        }
    }
}

/// One rendered state of the board.
///
/// Summary cards cover the whole load; only `rows` follows the query.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView<'a> {
    pub total: usize,
    pub showing: usize,
    pub stats: ShipmentStats,
    pub payments: PaymentSummary,
    pub rows: Vec<&'a ShipmentNormalized>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board() -> Loadboard {
        let raw: Vec<ShipmentRaw> = serde_json::from_value(json!([
            {"id": "A1", "status": "Delivered", "pieces": 3, "weight_kg": 10, "payment_type": "P",
             "portes": "10,50", "iva": "2,10", "total": "12,60", "origin_city": "Valencia"},
            {"id": "A2", "status": "In Transit", "pieces": 2, "weight_kg": 5, "payment_type": "D",
             "portes": "5,00", "iva": "1,00", "total": "6,00", "origin_city": "Madrid"},
            {"id": "TOTALES", "total": "18,60"}
        ]))
        .unwrap();
        Loadboard::from_raw(&raw)
    }

    fn ids(view: &BoardView<'_>) -> Vec<String> {
        view.rows.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn default_query_shows_everything() {
        let b = board();
        let view = b.view(&BoardQuery::default());
        assert_eq!(ids(&view), vec!["A1", "A2"]);
        assert_eq!(view.total, 2);
        assert_eq!(view.showing, 2);
    }

    #[test]
    fn search_a1_returns_only_a1() {
        let b = board();
        let view = b.view(&BoardQuery::default().search("a1"));
        assert_eq!(ids(&view), vec!["A1"]);
        assert_eq!(view.showing, 1);
        assert_eq!(view.total, 2);
    }

    #[test]
    fn summaries_ignore_search() {
        let b = board();
        let view = b.view(&BoardQuery::default().search("madrid"));
        assert_eq!(view.showing, 1);
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.payments.totals.count, 2);
    }

    #[test]
    fn status_filter_and_search_combine() {
        let b = board();
        let view = b.view(&BoardQuery::default().status(ShipmentStatus::InTransit));
        assert_eq!(ids(&view), vec!["A2"]);
        let view = b.view(
            &BoardQuery::default()
                .status(ShipmentStatus::InTransit)
                .search("valencia"),
        );
        assert!(view.rows.is_empty());
    }

    #[test]
    fn sort_applies_after_filtering() {
        let b = board();
        let view = b.view(&BoardQuery::default().sort(SortField::Total, SortDirection::Asc));
        assert_eq!(ids(&view), vec!["A2", "A1"]);
    }

    #[test]
    fn custom_search_fields() {
        let b = board().with_search_fields(vec![SearchField::Id]);
        assert!(b.view(&BoardQuery::default().search("valencia")).rows.is_empty());
        // Empty list keeps the defaults.
        let b = board().with_search_fields(Vec::new());
        assert_eq!(b.view(&BoardQuery::default().search("valencia")).showing, 1);
    }
}
