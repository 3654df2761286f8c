// JSON record decoding (resources, snapshots, pastes)

use loadboard_core::ShipmentRaw;
use serde_json::Value;

use crate::error::SourceError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A bare array, or an object whose `data` field is an array.
pub(crate) fn into_sequence(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Decode a record sequence. Elements that are not objects become empty
/// records and are dropped later by normalization.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<ShipmentRaw>, SourceError> {
    let value: Value = serde_json::from_slice(strip_bom(bytes))?;
    let items = into_sequence(value).ok_or(SourceError::NotASequence)?;
    Ok(items.into_iter().map(ShipmentRaw::from).collect())
}

/// Like [`parse_records`], but an empty sequence is also a failure.
pub fn parse_non_empty(bytes: &[u8]) -> Result<Vec<ShipmentRaw>, SourceError> {
    let records = parse_records(bytes)?;
    if records.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(records)
}

/// Serialize raw records back to a JSON array (snapshot slot format).
pub fn to_json(records: &[ShipmentRaw], pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(records)
    } else {
        serde_json::to_string(records)
    };
    // A Map<String, Value> always serializes.
    result.unwrap_or_else(|_| "[]".to_string())
}
