//! `loadboard-core` - shipment pipeline.
//!
//! Pure crate: receives raw shipment records, returns normalized rows,
//! filtered/sorted views and summary aggregates. No IO.

pub mod aggregate;
pub mod board;
pub mod coerce;
pub mod format;
pub mod model;
pub mod normalize;
pub mod search;
pub mod sort;

pub use aggregate::{compute_stats, payment_summary, PaymentBucket, PaymentSummary, ShipmentStats};
pub use board::{BoardQuery, BoardView, Loadboard};
pub use model::{PaymentType, ShipmentNormalized, ShipmentRaw, ShipmentStatus};
pub use normalize::{normalize, normalize_all};
pub use search::{filter_by_text, SearchField, DEFAULT_SEARCH_FIELDS};
pub use sort::{sort_by, SortDirection, SortField};
