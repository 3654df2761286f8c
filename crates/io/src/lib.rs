// Source resolution: snapshots, JSON and spreadsheet resources, pasted data

pub mod error;
pub mod json;
pub mod loader;
pub mod paste;
pub mod resolver;
pub mod snapshot;
pub mod spreadsheet;

pub use error::{PasteError, SourceError};
pub use loader::{AutoLoader, FsLoader, HttpLoader, ResourceLoader};
pub use paste::parse_paste;
pub use resolver::{Resolution, Resolver, SourceKind, EMPTY_DESCRIPTION};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
