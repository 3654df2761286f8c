use serde::{Deserialize, Serialize};

use crate::model::ShipmentNormalized;

/// Text fields the search box can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Id,
    OriginCity,
    DestCity,
    Carrier,
    Remitter,
    Consignee,
    ProductType,
    CurrentLoc,
    ContactName,
    OriginOffice,
}

/// Fields searched when nothing else is configured.
pub const DEFAULT_SEARCH_FIELDS: &[SearchField] = &[
    SearchField::Id,
    SearchField::OriginCity,
    SearchField::DestCity,
    SearchField::Carrier,
    SearchField::Remitter,
    SearchField::Consignee,
];

impl SearchField {
    pub fn value<'a>(&self, record: &'a ShipmentNormalized) -> &'a str {
        match self {
            Self::Id => &record.id,
            Self::OriginCity => &record.origin_city,
            Self::DestCity => &record.dest_city,
            Self::Carrier => &record.carrier,
            Self::Remitter => &record.remitter,
            Self::Consignee => &record.consignee,
            Self::ProductType => &record.product_type,
            Self::CurrentLoc => &record.current_loc,
            Self::ContactName => &record.contact_name,
            Self::OriginOffice => &record.origin_office,
        }
    }
}

/// Lowercased, trimmed needle; `None` means "match everything".
///
/// Surrounding whitespace is dropped before matching as well as for the
/// blank check, so `" valencia "` finds the same rows as `"valencia"`.
/// Inner whitespace is kept: `"los angeles"` still needs the space.
pub fn prepare_query(query: &str) -> Option<String> {
    let q = query.trim();
    (!q.is_empty()).then(|| q.to_lowercase())
}

/// True when `needle` (already lowercased) occurs in any of `fields`.
pub fn matches_text(record: &ShipmentNormalized, needle: &str, fields: &[SearchField]) -> bool {
    fields.iter().any(|field| {
        let value = field.value(record);
        !value.is_empty() && value.to_lowercase().contains(needle)
    })
}

/// Case-insensitive substring search, OR across `fields`.
///
/// A blank query returns every record in its original order.
pub fn filter_by_text<'a>(
    records: &'a [ShipmentNormalized],
    query: &str,
    fields: &[SearchField],
) -> Vec<&'a ShipmentNormalized> {
    match prepare_query(query) {
        None => records.iter().collect(),
        Some(needle) => records
            .iter()
            .filter(|r| matches_text(r, &needle, fields))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship(id: &str, origin: &str, remitter: &str) -> ShipmentNormalized {
        ShipmentNormalized {
            id: id.into(),
            origin_city: origin.into(),
            remitter: remitter.into(),
            ..Default::default()
        }
    }

    fn ids(rows: &[&ShipmentNormalized]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn blank_query_returns_everything_in_order() {
        let records = vec![ship("B", "", ""), ship("A", "", ""), ship("C", "", "")];
        assert_eq!(ids(&filter_by_text(&records, "", DEFAULT_SEARCH_FIELDS)), vec!["B", "A", "C"]);
        assert_eq!(ids(&filter_by_text(&records, "   ", DEFAULT_SEARCH_FIELDS)), vec!["B", "A", "C"]);
    }

    #[test]
    fn match_is_or_across_fields() {
        let records = vec![
            ship("EP-1", "Valencia", "Acme"),
            ship("EP-2", "Madrid", "Valencia Textiles"),
            ship("EP-3", "Sevilla", "Other"),
        ];
        let hits = filter_by_text(&records, "valencia", DEFAULT_SEARCH_FIELDS);
        assert_eq!(ids(&hits), vec!["EP-1", "EP-2"]);
    }

    #[test]
    fn case_insensitive() {
        let records = vec![ship("ep-1", "Valencia", ""), ship("EP-2", "Bilbao", "")];
        assert_eq!(
            ids(&filter_by_text(&records, "EP-1", DEFAULT_SEARCH_FIELDS)),
            ids(&filter_by_text(&records, "ep-1", DEFAULT_SEARCH_FIELDS))
        );
        assert_eq!(ids(&filter_by_text(&records, "BILBAO", DEFAULT_SEARCH_FIELDS)), vec!["EP-2"]);
    }

    #[test]
    fn padded_query_is_trimmed_before_matching() {
        let records = vec![ship("EP-1", "Valencia", ""), ship("EP-2", "San Sebastián", "")];
        assert_eq!(ids(&filter_by_text(&records, "  valencia \t", DEFAULT_SEARCH_FIELDS)), vec!["EP-1"]);
        assert_eq!(ids(&filter_by_text(&records, " san sebas", DEFAULT_SEARCH_FIELDS)), vec!["EP-2"]);
        assert!(filter_by_text(&records, "sansebas", DEFAULT_SEARCH_FIELDS).is_empty());
    }

    #[test]
    fn respects_declared_field_subset() {
        let records = vec![ship("EP-1", "Valencia", "")];
        assert!(filter_by_text(&records, "valencia", &[SearchField::Id]).is_empty());
        assert_eq!(filter_by_text(&records, "valencia", &[SearchField::OriginCity]).len(), 1);
    }

    #[test]
    fn field_names_deserialize_snake_case() {
        let f: Vec<SearchField> = serde_json::from_str(r#"["id", "dest_city", "contact_name"]"#).unwrap();
        assert_eq!(f, vec![SearchField::Id, SearchField::DestCity, SearchField::ContactName]);
    }
}
