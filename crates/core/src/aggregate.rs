use std::ops::Add;

use serde::{Serialize, Serializer};

use crate::coerce::to_cents;
use crate::model::{PaymentType, ShipmentNormalized, ShipmentStatus};

// ---------------------------------------------------------------------------
// Shipment counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStats {
    pub total: usize,
    pub delivered: usize,
    pub in_transit: usize,
    pub total_pieces: i64,
    pub total_weight: f64,
}

/// Headline counts; missing pieces/weight count as zero.
///
/// Integer sums saturate at `i64::MAX` instead of overflowing.
pub fn compute_stats<'a, I>(records: I) -> ShipmentStats
where
    I: IntoIterator<Item = &'a ShipmentNormalized>,
{
    records.into_iter().fold(ShipmentStats::default(), |mut acc, s| {
        acc.total = acc.total.saturating_add(1);
        if s.status == ShipmentStatus::Delivered {
            acc.delivered = acc.delivered.saturating_add(1);
        }
        if s.status.is_moving() {
            acc.in_transit = acc.in_transit.saturating_add(1);
        }
        acc.total_pieces = acc.total_pieces.saturating_add(s.pieces.unwrap_or(0));
        acc.total_weight += s.weight_kg.unwrap_or(0.0);
        acc
    })
}

// ---------------------------------------------------------------------------
// Paid / due / totals
// ---------------------------------------------------------------------------

fn cents_as_decimal<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(*cents as f64 / 100.0)
}

/// One column of the finance header. Money is kept in cents so sums are exact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PaymentBucket {
    pub pieces: i64,
    pub kg: f64,
    #[serde(rename = "portes", serialize_with = "cents_as_decimal")]
    pub freight_cents: i64,
    #[serde(rename = "iva", serialize_with = "cents_as_decimal")]
    pub vat_cents: i64,
    #[serde(rename = "total", serialize_with = "cents_as_decimal")]
    pub total_cents: i64,
    pub count: usize,
}

impl PaymentBucket {
    fn push(&mut self, s: &ShipmentNormalized) {
        self.pieces = self.pieces.saturating_add(s.pieces.unwrap_or(0));
        self.kg += s.weight_kg.unwrap_or(0.0);
        self.freight_cents = self.freight_cents.saturating_add(s.freight.map_or(0, to_cents));
        self.vat_cents = self.vat_cents.saturating_add(s.vat.map_or(0, to_cents));
        self.total_cents = self.total_cents.saturating_add(s.total.map_or(0, to_cents));
        self.count = self.count.saturating_add(1);
    }

    pub fn freight(&self) -> f64 {
        self.freight_cents as f64 / 100.0
    }

    pub fn vat(&self) -> f64 {
        self.vat_cents as f64 / 100.0
    }

    pub fn total(&self) -> f64 {
        self.total_cents as f64 / 100.0
    }
}

impl Add for PaymentBucket {
    type Output = PaymentBucket;

    fn add(self, rhs: PaymentBucket) -> PaymentBucket {
        PaymentBucket {
            pieces: self.pieces.saturating_add(rhs.pieces),
            kg: self.kg + rhs.kg,
            freight_cents: self.freight_cents.saturating_add(rhs.freight_cents),
            vat_cents: self.vat_cents.saturating_add(rhs.vat_cents),
            total_cents: self.total_cents.saturating_add(rhs.total_cents),
            count: self.count.saturating_add(rhs.count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PaymentSummary {
    pub paid: PaymentBucket,
    pub due: PaymentBucket,
    /// Always `paid + due`; never accumulated on its own.
    pub totals: PaymentBucket,
}

/// Split records into paid/due buckets by payment tag.
///
/// Records whose tag is neither `P` nor `D` are left out of every bucket.
pub fn payment_summary<'a, I>(records: I) -> PaymentSummary
where
    I: IntoIterator<Item = &'a ShipmentNormalized>,
{
    let mut paid = PaymentBucket::default();
    let mut due = PaymentBucket::default();

    for s in records {
        match s.payment() {
            Some(PaymentType::Paid) => paid.push(s),
            Some(PaymentType::Due) => due.push(s),
            None => {}
        }
    }

    PaymentSummary {
        paid,
        due,
        totals: paid + due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShipmentRaw;
    use crate::normalize::normalize_all;
    use serde_json::json;

    fn scenario() -> Vec<ShipmentNormalized> {
        let raw: Vec<ShipmentRaw> = serde_json::from_value(json!([
            {"id": "A1", "status": "Delivered", "pieces": 3, "weight_kg": 10, "payment_type": "P",
             "portes": "10,50", "iva": "2,10", "total": "12,60"},
            {"id": "A2", "status": "In Transit", "pieces": 2, "weight_kg": 5, "payment_type": "D",
             "portes": "5,00", "iva": "1,00", "total": "6,00"}
        ]))
        .unwrap();
        normalize_all(&raw)
    }

    #[test]
    fn counts_for_two_record_scenario() {
        let stats = compute_stats(&scenario());
        assert_eq!(
            stats,
            ShipmentStats {
                total: 2,
                delivered: 1,
                in_transit: 1,
                total_pieces: 5,
                total_weight: 15.0,
            }
        );
    }

    #[test]
    fn payment_summary_for_two_record_scenario() {
        let summary = payment_summary(&scenario());

        assert_eq!(summary.paid.pieces, 3);
        assert_eq!(summary.paid.kg, 10.0);
        assert_eq!(summary.paid.freight_cents, 1050);
        assert_eq!(summary.paid.vat_cents, 210);
        assert_eq!(summary.paid.total_cents, 1260);
        assert_eq!(summary.paid.count, 1);

        assert_eq!(summary.due.pieces, 2);
        assert_eq!(summary.due.kg, 5.0);
        assert_eq!(summary.due.freight(), 5.00);
        assert_eq!(summary.due.vat(), 1.00);
        assert_eq!(summary.due.total(), 6.00);
        assert_eq!(summary.due.count, 1);

        assert_eq!(summary.totals.pieces, 5);
        assert_eq!(summary.totals.kg, 15.0);
        assert_eq!(summary.totals.freight(), 15.50);
        assert_eq!(summary.totals.vat(), 3.10);
        assert_eq!(summary.totals.total(), 18.60);
        assert_eq!(summary.totals.count, 2);
    }

    #[test]
    fn totals_equal_paid_plus_due() {
        let summary = payment_summary(&scenario());
        assert_eq!(summary.totals.total_cents, summary.paid.total_cents + summary.due.total_cents);
        assert_eq!(summary.totals, summary.paid + summary.due);
    }

    #[test]
    fn empty_set_is_all_zero() {
        let summary = payment_summary(&[]);
        assert_eq!(summary, PaymentSummary::default());
        assert_eq!(compute_stats(&[]), ShipmentStats::default());
    }

    #[test]
    fn unknown_payment_tags_are_dropped() {
        let mut records = scenario();
        records.push(ShipmentNormalized {
            id: "A3".into(),
            pieces: Some(7),
            total: Some(100.0),
            payment_type: "X".into(),
            ..Default::default()
        });
        let summary = payment_summary(&records);
        assert_eq!(summary.totals.count, 2);
        assert_eq!(summary.totals.pieces, 5);
        // Still counted on the shipment cards.
        assert_eq!(compute_stats(&records).total, 3);
    }

    #[test]
    fn out_for_delivery_counts_as_in_transit() {
        let records = vec![
            ShipmentNormalized { status: ShipmentStatus::OutForDelivery, ..Default::default() },
            ShipmentNormalized { status: ShipmentStatus::Delayed, ..Default::default() },
        ];
        let stats = compute_stats(&records);
        assert_eq!(stats.in_transit, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn oversized_values_saturate_instead_of_overflowing() {
        let raw: Vec<ShipmentRaw> = serde_json::from_value(json!([
            {"id": "A1", "pieces": 1e300, "total": 1e300, "portes": 1e300, "payment_type": "P"},
            {"id": "A2", "pieces": 1e300, "total": 1e300, "portes": 1e300, "payment_type": "P"},
            {"id": "A3", "pieces": 1e300, "total": 1e300, "payment_type": "D"}
        ]))
        .unwrap();
        let records = normalize_all(&raw);
        assert_eq!(records[0].pieces, Some(i64::MAX));

        let stats = compute_stats(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_pieces, i64::MAX);

        let summary = payment_summary(&records);
        assert_eq!(summary.paid.pieces, i64::MAX);
        assert_eq!(summary.paid.total_cents, i64::MAX);
        assert_eq!(summary.paid.freight_cents, i64::MAX);
        assert_eq!(summary.paid.count, 2);
        assert_eq!(summary.totals.total_cents, i64::MAX);
        assert_eq!(summary.totals.count, 3);
        assert_eq!(summary.totals, summary.paid + summary.due);
    }

    #[test]
    fn summary_serializes_with_card_keys() {
        let v = serde_json::to_value(payment_summary(&scenario())).unwrap();
        assert_eq!(v["paid"]["portes"], 10.5);
        assert_eq!(v["totals"]["total"], 18.6);
        assert_eq!(v["totals"]["count"], 2);
        assert_eq!(v["due"]["kg"], 5.0);
    }
}
