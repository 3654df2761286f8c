use serde_json::Value;

use crate::coerce::{coerce_decimal, coerce_int, coerce_money, round2};
use crate::model::{value_as_text, ShipmentNormalized, ShipmentRaw, ShipmentStatus};

/// Identifier of the spreadsheet summary row; never a real shipment.
pub const TOTALS_SENTINEL: &str = "TOTALES";

// ---------------------------------------------------------------------------
// Accepted keys per logical field (snake_case input, camelCase re-input)
// ---------------------------------------------------------------------------

const ID: &[&str] = &["id"];
const ORIGIN_CITY: &[&str] = &["origin_city", "originCity"];
const ORIGIN_COUNTRY: &[&str] = &["origin_country", "originCountry"];
const DEST_CITY: &[&str] = &["dest_city", "destCity"];
const DEST_COUNTRY: &[&str] = &["dest_country", "destCountry"];
const PRODUCT_TYPE: &[&str] = &["product_type", "productType"];
const CARRIER: &[&str] = &["carrier"];
const PIECES: &[&str] = &["pieces"];
const WEIGHT: &[&str] = &["weight_kg", "weightKg"];
const STATUS: &[&str] = &["status"];
const ETA: &[&str] = &["eta"];
const LAST_SEEN: &[&str] = &["last_seen", "lastSeen"];
const CURRENT_LOC: &[&str] = &["current_loc", "currentLoc"];
const CHECKPOINTS: &[&str] = &["checkpoints"];
const CHECKPOINT_LABEL: &[&str] = &["last_checkpoint_label", "lastCheckpointLabel"];
const CHECKPOINT_TS: &[&str] = &["last_checkpoint_ts", "lastCheckpointTs"];
const CONTACT: &[&str] = &["contact"];
const CONTACT_NAME: &[&str] = &["contact_name", "contactName"];
const SHIPPED_ON: &[&str] = &["fecha"];
const ORIGIN_OFFICE: &[&str] = &["exp_ori", "expOri"];
const REMITTER: &[&str] = &["remitente"];
const CONSIGNEE: &[&str] = &["consignatario"];
const FREIGHT: &[&str] = &["portes"];
const RESHIPMENT: &[&str] = &["reexp"];
const COD_AMOUNT: &[&str] = &["reemb"];
const COD_FEE: &[&str] = &["g_reem", "gReem"];
const CLEARANCE: &[&str] = &["desemb"];
const INSURANCE: &[&str] = &["seguro"];
const VAT: &[&str] = &["iva"];
const TOTAL: &[&str] = &["total"];
const PAYMENT_TYPE: &[&str] = &["payment_type", "paymentType"];

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

fn text(raw: &ShipmentRaw, keys: &[&str]) -> String {
    raw.text(keys).unwrap_or_default()
}

/// Text field where blank means absent.
fn opt_text(raw: &ShipmentRaw, keys: &[&str]) -> Option<String> {
    raw.text(keys).filter(|s| !s.trim().is_empty())
}

fn int(raw: &ShipmentRaw, keys: &[&str]) -> Option<i64> {
    match raw.get(keys)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64),
        Value::String(s) => coerce_int(s),
        _ => None,
    }
}

fn decimal(raw: &ShipmentRaw, keys: &[&str]) -> Option<f64> {
    match raw.get(keys)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => coerce_decimal(s),
        _ => None,
    }
}

fn money(raw: &ShipmentRaw, keys: &[&str]) -> Option<f64> {
    match raw.get(keys)? {
        Value::Number(n) => n.as_f64().map(round2).filter(|f| f.is_finite()),
        Value::String(s) => coerce_money(s),
        _ => None,
    }
}

/// Label and timestamp of the most recent checkpoint.
///
/// Falls back to already-hoisted fields so a normalized record re-normalizes
/// to itself.
fn last_checkpoint(raw: &ShipmentRaw) -> (String, Option<String>) {
    let last = raw
        .get(CHECKPOINTS)
        .and_then(Value::as_array)
        .and_then(|list| list.last());

    match last {
        Some(cp) => (
            cp.get("label").and_then(value_as_text).unwrap_or_default(),
            cp.get("ts")
                .and_then(value_as_text)
                .filter(|s| !s.trim().is_empty()),
        ),
        None => (text(raw, CHECKPOINT_LABEL), opt_text(raw, CHECKPOINT_TS)),
    }
}

fn contact_name(raw: &ShipmentRaw) -> String {
    raw.get(CONTACT)
        .and_then(|c| c.get("name"))
        .and_then(value_as_text)
        .or_else(|| raw.text(CONTACT_NAME))
        .unwrap_or_default()
}

fn status(raw: &ShipmentRaw) -> ShipmentStatus {
    opt_text(raw, STATUS)
        .map(|tag| ShipmentStatus::from_tag(&tag))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve every field of a raw record to a value or default.
///
/// Total over any input shape; never panics, never errors.
pub fn normalize(raw: &ShipmentRaw) -> ShipmentNormalized {
    let (last_checkpoint_label, last_checkpoint_ts) = last_checkpoint(raw);

    ShipmentNormalized {
        id: text(raw, ID),
        origin_city: text(raw, ORIGIN_CITY),
        origin_country: text(raw, ORIGIN_COUNTRY),
        dest_city: text(raw, DEST_CITY),
        dest_country: text(raw, DEST_COUNTRY),
        product_type: text(raw, PRODUCT_TYPE),
        carrier: text(raw, CARRIER),
        pieces: int(raw, PIECES),
        weight_kg: decimal(raw, WEIGHT),
        status: status(raw),
        eta: opt_text(raw, ETA),
        last_seen: opt_text(raw, LAST_SEEN),
        current_loc: text(raw, CURRENT_LOC),
        last_checkpoint_label,
        last_checkpoint_ts,
        contact_name: contact_name(raw),

        shipped_on: opt_text(raw, SHIPPED_ON),
        origin_office: text(raw, ORIGIN_OFFICE),
        remitter: text(raw, REMITTER),
        consignee: text(raw, CONSIGNEE),
        freight: money(raw, FREIGHT),
        reshipment: money(raw, RESHIPMENT),
        cod_amount: money(raw, COD_AMOUNT),
        cod_fee: money(raw, COD_FEE),
        clearance: money(raw, CLEARANCE),
        insurance: money(raw, INSURANCE),
        vat: money(raw, VAT),
        total: money(raw, TOTAL),
        payment_type: text(raw, PAYMENT_TYPE),
    }
}

/// Whether a raw record carries a usable shipment identifier.
pub fn has_shipment_id(raw: &ShipmentRaw) -> bool {
    raw.text(ID)
        .map(|id| {
            let id = id.trim();
            !id.is_empty() && id != TOTALS_SENTINEL
        })
        .unwrap_or(false)
}

/// Normalize a load, dropping rows without an identifier and the totals row.
/// Input order is preserved.
pub fn normalize_all(raw: &[ShipmentRaw]) -> Vec<ShipmentNormalized> {
    raw.iter()
        .filter(|r| has_shipment_id(r))
        .map(normalize)
        .collect()
}
