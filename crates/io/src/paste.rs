// Manual paste validation

use loadboard_core::ShipmentRaw;
use serde_json::Value;

use crate::error::PasteError;
use crate::json::{into_sequence, strip_bom};

/// Validate user-pasted text as a record sequence.
///
/// An empty array is accepted; it loads an empty board.
pub fn parse_paste(text: &str) -> Result<Vec<ShipmentRaw>, PasteError> {
    let value: Value = serde_json::from_slice(strip_bom(text.trim().as_bytes()))?;
    let items = into_sequence(value).ok_or(PasteError::NotASequence)?;
    Ok(items.into_iter().map(ShipmentRaw::from).collect())
}
