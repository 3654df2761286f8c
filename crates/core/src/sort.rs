//! Column sorting for the board.
//!
//! Key invariants:
//! - Sorting is stable: equal keys keep their input order
//! - Missing values (None / empty text) sort below any present value
//! - Numbers compare numerically, text case-insensitively, timestamps by instant

use std::borrow::Borrow;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::coerce::parse_timestamp;
use crate::model::ShipmentNormalized;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    OriginCity,
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
    ProductType,
    Carrier,
    Status,
    Eta,
    LastSeen,
    CurrentLoc,
    LastCheckpoint,
    ContactName,
    ShippedOn,
}

impl SortField {
    pub const ALL: [SortField; 25] = [
        Self::Id,
        Self::OriginCity,
        Self::DestCity,
        Self::Remitter,
        Self::Consignee,
        Self::Pieces,
        Self::WeightKg,
        Self::Freight,
        Self::Reshipment,
        Self::CodAmount,
        Self::CodFee,
        Self::Clearance,
        Self::Insurance,
        Self::Vat,
        Self::Total,
        Self::PaymentType,
        Self::ProductType,
        Self::Carrier,
        Self::Status,
        Self::Eta,
        Self::LastSeen,
        Self::CurrentLoc,
        Self::LastCheckpoint,
        Self::ContactName,
        Self::ShippedOn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::OriginCity => "origin_city",
            Self::DestCity => "dest_city",
            Self::Remitter => "remitter",
            Self::Consignee => "consignee",
            Self::Pieces => "pieces",
            Self::WeightKg => "weight_kg",
            Self::Freight => "freight",
            Self::Reshipment => "reshipment",
            Self::CodAmount => "cod_amount",
            Self::CodFee => "cod_fee",
            Self::Clearance => "clearance",
            Self::Insurance => "insurance",
            Self::Vat => "vat",
            Self::Total => "total",
            Self::PaymentType => "payment_type",
            Self::ProductType => "product_type",
            Self::Carrier => "carrier",
            Self::Status => "status",
            Self::Eta => "eta",
            Self::LastSeen => "last_seen",
            Self::CurrentLoc => "current_loc",
            Self::LastCheckpoint => "last_checkpoint",
            Self::ContactName => "contact_name",
            Self::ShippedOn => "shipped_on",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortField {
    type Err = String;

    /// Accepts the snake_case name, with `-` allowed in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| format!("unknown sort field '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Comparable projection of one field. Variant order puts `Missing` first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Missing,
    Number(OrderedFloat<f64>),
    Time(DateTime<Utc>),
    Text(String),
}

fn text_key(s: &str) -> SortKey {
    if s.trim().is_empty() {
        SortKey::Missing
    } else {
        SortKey::Text(s.to_lowercase())
    }
}

fn number_key(n: Option<f64>) -> SortKey {
    n.map_or(SortKey::Missing, |n| SortKey::Number(OrderedFloat(n)))
}

fn time_key(ts: Option<&str>) -> SortKey {
    match ts {
        None => SortKey::Missing,
        Some(ts) => parse_timestamp(ts).map_or_else(|| text_key(ts), SortKey::Time),
    }
}

fn sort_key(r: &ShipmentNormalized, field: SortField) -> SortKey {
    match field {
        SortField::Id => text_key(&r.id),
        SortField::OriginCity => text_key(&r.origin_city),
        SortField::DestCity => text_key(&r.dest_city),
        SortField::Remitter => text_key(&r.remitter),
        SortField::Consignee => text_key(&r.consignee),
        SortField::Pieces => number_key(r.pieces.map(|p| p as f64)),
        SortField::WeightKg => number_key(r.weight_kg),
        SortField::Freight => number_key(r.freight),
        SortField::Reshipment => number_key(r.reshipment),
        SortField::CodAmount => number_key(r.cod_amount),
        SortField::CodFee => number_key(r.cod_fee),
        SortField::Clearance => number_key(r.clearance),
        SortField::Insurance => number_key(r.insurance),
        SortField::Vat => number_key(r.vat),
        SortField::Total => number_key(r.total),
        SortField::PaymentType => text_key(&r.payment_type),
        SortField::ProductType => text_key(&r.product_type),
        SortField::Carrier => text_key(&r.carrier),
        SortField::Status => text_key(r.status.as_str()),
        SortField::Eta => time_key(r.eta.as_deref()),
        SortField::LastSeen => time_key(r.last_seen.as_deref()),
        SortField::CurrentLoc => text_key(&r.current_loc),
        SortField::LastCheckpoint => time_key(r.last_checkpoint_ts.as_deref()),
        SortField::ContactName => text_key(&r.contact_name),
        SortField::ShippedOn => time_key(r.shipped_on.as_deref()),
    }
}

/// Stable in-place sort of owned records or references.
pub fn sort_by<T: Borrow<ShipmentNormalized>>(
    records: &mut [T],
    field: SortField,
    direction: SortDirection,
) {
    match direction {
        SortDirection::Asc => records.sort_by_cached_key(|r| sort_key(r.borrow(), field)),
        SortDirection::Desc => records.sort_by_cached_key(|r| Reverse(sort_key(r.borrow(), field))),
    }
}
