use thiserror::Error;

/// Why one resolver attempt produced nothing.
///
/// The resolver logs these and moves on; they only reach the user through
/// `lboard import` and `lboard snapshot show`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no location configured")]
    NotConfigured,
    #[error("cannot read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array or an object with a `data` array")]
    NotASequence,
    #[error("source holds no records")]
    Empty,
    #[error("cannot read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("cannot read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("no header row in the first {scanned} rows (best score {best}, need {needed})")]
    NoHeader {
        scanned: usize,
        best: usize,
        needed: usize,
    },
}

/// Rejected manual paste. Existing data is left untouched.
#[derive(Debug, Error)]
pub enum PasteError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("pasted data must be a JSON array, or an object with a `data` array")]
    NotASequence,
}
