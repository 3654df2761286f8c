use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A shipment record as it arrives from a source: a loose JSON object.
///
/// Any field may be missing, null, or of an unexpected type. Keys may be
/// snake_case or camelCase. Non-object inputs deserialize to an empty record
/// rather than failing, so a single bad element never poisons a whole array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ShipmentRaw {
    fields: Map<String, Value>,
}

impl ShipmentRaw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by the spreadsheet mapper and tests.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First non-null value among `keys`.
    pub fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| !v.is_null())
    }

    /// First non-null value among `keys`, rendered as text.
    ///
    /// Strings pass through, numbers and booleans are stringified,
    /// objects and arrays count as absent.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        self.get(keys).and_then(value_as_text)
    }
}

pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<Value> for ShipmentRaw {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

impl From<Map<String, Value>> for ShipmentRaw {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<'de> Deserialize<'de> for ShipmentRaw {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

// ---------------------------------------------------------------------------
// Status + payment tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShipmentStatus {
    Created,
    AtPickup,
    #[default]
    InTransit,
    AtHub,
    OutForDelivery,
    Delayed,
    Delivered,
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl ShipmentStatus {
    pub const KNOWN: [ShipmentStatus; 7] = [
        Self::Created,
        Self::AtPickup,
        Self::InTransit,
        Self::AtHub,
        Self::OutForDelivery,
        Self::Delayed,
        Self::Delivered,
    ];

    /// Exact tag match. Tags are case-sensitive in source data.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Created" => Self::Created,
            "At Pickup" => Self::AtPickup,
            "In Transit" => Self::InTransit,
            "At Hub" => Self::AtHub,
            "Out-For-Delivery" => Self::OutForDelivery,
            "Delayed" => Self::Delayed,
            "Delivered" => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }

    /// Loose match for user-typed filters: ignores case, spaces, dashes and underscores.
    pub fn parse_loose(input: &str) -> Self {
        let squash = |s: &str| {
            s.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        };
        let wanted = squash(input);
        Self::KNOWN
            .iter()
            .find(|s| squash(s.as_str()) == wanted)
            .cloned()
            .unwrap_or_else(|| Self::Other(input.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::AtPickup => "At Pickup",
            Self::InTransit => "In Transit",
            Self::AtHub => "At Hub",
            Self::OutForDelivery => "Out-For-Delivery",
            Self::Delayed => "Delayed",
            Self::Delivered => "Delivered",
            Self::Other(tag) => tag,
        }
    }

    /// Counted under "in transit / OFD" on the summary cards.
    pub fn is_moving(&self) -> bool {
        matches!(self, Self::InTransit | Self::OutForDelivery)
    }
}

impl From<String> for ShipmentStatus {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ShipmentStatus> for String {
    fn from(status: ShipmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice state carried by the single-letter payment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Paid,
    Due,
}

impl PaymentType {
    /// `"P"` is paid, `"D"` is due, anything else has no bucket.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "P" => Some(Self::Paid),
            "D" => Some(Self::Due),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized record
// ---------------------------------------------------------------------------

/// A shipment with every field resolved to a value or an explicit `None`.
///
/// Serialized keys follow the camelCase form of the input vocabulary, so a
/// serialized record can be fed back through `normalize` unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipmentNormalized {
    pub id: String,
    pub origin_city: String,
    pub origin_country: String,
    pub dest_city: String,
    pub dest_country: String,
    pub product_type: String,
    pub carrier: String,
    pub pieces: Option<i64>,
    pub weight_kg: Option<f64>,
    pub status: ShipmentStatus,
    pub eta: Option<String>,
    pub last_seen: Option<String>,
    pub current_loc: String,
    pub last_checkpoint_label: String,
    pub last_checkpoint_ts: Option<String>,
    pub contact_name: String,

    // Invoicing
    #[serde(rename = "fecha")]
    pub shipped_on: Option<String>,
    #[serde(rename = "expOri")]
    pub origin_office: String,
    #[serde(rename = "remitente")]
    pub remitter: String,
    #[serde(rename = "consignatario")]
    pub consignee: String,
    #[serde(rename = "portes")]
    pub freight: Option<f64>,
    #[serde(rename = "reexp")]
    pub reshipment: Option<f64>,
    #[serde(rename = "reemb")]
    pub cod_amount: Option<f64>,
    #[serde(rename = "gReem")]
    pub cod_fee: Option<f64>,
    #[serde(rename = "desemb")]
    pub clearance: Option<f64>,
    #[serde(rename = "seguro")]
    pub insurance: Option<f64>,
    #[serde(rename = "iva")]
    pub vat: Option<f64>,
    pub total: Option<f64>,
    pub payment_type: String,
}

impl ShipmentNormalized {
    pub fn payment(&self) -> Option<PaymentType> {
        PaymentType::from_tag(&self.payment_type)
    }
}
