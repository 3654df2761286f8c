//! Source resolution.
//!
//! Attempts, in order: local snapshot, JSON resource, spreadsheet resource.
//! The first attempt yielding a non-empty record sequence wins. Failures are
//! logged and fall through; `resolve()` itself never fails.

use chrono::{DateTime, Utc};
use loadboard_config::LoadboardConfig;
use loadboard_core::ShipmentRaw;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::json::parse_non_empty;
use crate::loader::ResourceLoader;
use crate::snapshot::SnapshotStore;
use crate::spreadsheet::parse_spreadsheet;

/// Automatic attempts; pasted data only arrives through [`Resolution::from_paste`].
const ATTEMPT_ORDER: [SourceKind; 3] = [SourceKind::Snapshot, SourceKind::Json, SourceKind::Spreadsheet];

pub const EMPTY_DESCRIPTION: &str = "No shipment data found. Paste a JSON array to load shipments.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Snapshot,
    Json,
    Spreadsheet,
    Paste,
    Empty,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Json => "json",
            Self::Spreadsheet => "spreadsheet",
            Self::Paste => "paste",
            Self::Empty => "empty",
        }
    }
}

/// Raw records plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub records: Vec<ShipmentRaw>,
    pub source: SourceKind,
    pub description: String,
}

impl Resolution {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            source: SourceKind::Empty,
            description: EMPTY_DESCRIPTION.to_string(),
        }
    }

    pub fn from_paste(records: Vec<ShipmentRaw>) -> Self {
        Self {
            description: format!("{} records from pasted data", records.len()),
            records,
            source: SourceKind::Paste,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source == SourceKind::Empty
    }
}

pub struct Resolver<'a> {
    config: &'a LoadboardConfig,
    snapshots: &'a dyn SnapshotStore,
    loader: &'a dyn ResourceLoader,
    now: DateTime<Utc>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a LoadboardConfig,
        snapshots: &'a dyn SnapshotStore,
        loader: &'a dyn ResourceLoader,
    ) -> Self {
        Self {
            config,
            snapshots,
            loader,
            now: Utc::now(),
        }
    }

    /// Fixed clock for spreadsheet date coercion.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn resolve(&self) -> Resolution {
        for source in ATTEMPT_ORDER {
            let label = self.label(source);
            debug!(source = source.as_str(), "trying {label}");
            match self.attempt(source) {
                Ok(records) => {
                    info!(source = source.as_str(), records = records.len(), "loaded {label}");
                    return Resolution {
                        description: format!("{} records from {label}", records.len()),
                        records,
                        source,
                    };
                }
                Err(err) => debug!(source = source.as_str(), error = %err, "{label} unavailable"),
            }
        }

        debug!("every source failed");
        Resolution::empty()
    }

    fn label(&self, source: SourceKind) -> String {
        let unset = || "(unset)".to_string();
        match source {
            SourceKind::Snapshot => format!("local snapshot '{}'", self.config.sources.snapshot_key),
            SourceKind::Json => format!(
                "JSON resource {}",
                self.config.json_location().unwrap_or_else(unset)
            ),
            SourceKind::Spreadsheet => format!(
                "spreadsheet {}",
                self.config.spreadsheet_location().unwrap_or_else(unset)
            ),
            SourceKind::Paste => "pasted data".to_string(),
            SourceKind::Empty => "nothing".to_string(),
        }
    }

    fn attempt(&self, source: SourceKind) -> Result<Vec<ShipmentRaw>, SourceError> {
        match source {
            SourceKind::Snapshot => self.try_snapshot(&self.config.sources.snapshot_key),
            SourceKind::Json => self.try_json(self.config.json_location().as_deref()),
            SourceKind::Spreadsheet => self.try_spreadsheet(self.config.spreadsheet_location().as_deref()),
            SourceKind::Paste | SourceKind::Empty => Err(SourceError::NotConfigured),
        }
    }

    fn try_snapshot(&self, key: &str) -> Result<Vec<ShipmentRaw>, SourceError> {
        let text = self.snapshots.get(key)?.ok_or(SourceError::Empty)?;
        parse_non_empty(text.as_bytes()).inspect_err(|err| {
            if !matches!(err, SourceError::Empty) {
                warn!(key, error = %err, "ignoring corrupt snapshot");
            }
        })
    }

    fn try_json(&self, location: Option<&str>) -> Result<Vec<ShipmentRaw>, SourceError> {
        let location = location.ok_or(SourceError::NotConfigured)?;
        let bytes = self.loader.fetch(location)?;
        parse_non_empty(&bytes)
    }

    fn try_spreadsheet(&self, location: Option<&str>) -> Result<Vec<ShipmentRaw>, SourceError> {
        let location = location.ok_or(SourceError::NotConfigured)?;
        let bytes = self.loader.fetch(location)?;
        parse_spreadsheet(&bytes, location, &self.config.spreadsheet, self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MemorySnapshotStore;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned bytes and records which locations were asked for.
    #[derive(Default)]
    struct CannedLoader {
        resources: HashMap<String, Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl CannedLoader {
        fn with(mut self, location: &str, body: &[u8]) -> Self {
            self.resources.insert(location.to_string(), body.to_vec());
            self
        }
    }

    impl ResourceLoader for CannedLoader {
        fn fetch(&self, location: &str) -> Result<Vec<u8>, SourceError> {
            self.requested.borrow_mut().push(location.to_string());
            self.resources.get(location).cloned().ok_or_else(|| SourceError::Status {
                url: location.to_string(),
                status: 404,
            })
        }
    }

    fn config() -> LoadboardConfig {
        let mut config = LoadboardConfig::default();
        config.sources.json = Some("/srv/shipments.json".into());
        config.sources.spreadsheet = Some("/srv/shipments.csv".into());
        config
    }

    const SHEET: &[u8] = b"Fecha;Albaran;Remitente;Consignatario;Destino;Bultos;Kg;Portes;IVA;Total\n\
05/03/2024;1001;A;B;Madrid;2;10;5,00;1,00;6,00\n";

    #[test]
    fn snapshot_wins_without_touching_resources() {
        let config = config();
        let store = MemorySnapshotStore::new().with_slot("shipments", r#"[{"id": "S1"}]"#);
        let loader = CannedLoader::default().with("/srv/shipments.json", br#"[{"id": "J1"}]"#);

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert_eq!(res.source, SourceKind::Snapshot);
        assert_eq!(res.records.len(), 1);
        assert!(loader.requested.borrow().is_empty());
    }

    #[test]
    fn empty_snapshot_falls_through_to_json() {
        let config = config();
        let store = MemorySnapshotStore::new().with_slot("shipments", "[]");
        let loader = CannedLoader::default().with("/srv/shipments.json", br#"{"data": [{"id": "J1"}]}"#);

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert_eq!(res.source, SourceKind::Json);
        assert_eq!(res.records[0].text(&["id"]).as_deref(), Some("J1"));
        assert!(res.description.contains("/srv/shipments.json"));
    }

    #[test]
    fn corrupt_snapshot_falls_through() {
        let config = config();
        let store = MemorySnapshotStore::new().with_slot("shipments", "{not json");
        let loader = CannedLoader::default().with("/srv/shipments.json", br#"[{"id": "J1"}]"#);

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert_eq!(res.source, SourceKind::Json);
    }

    #[test]
    fn spreadsheet_is_the_last_resort() {
        let config = config();
        let store = MemorySnapshotStore::new();
        let loader = CannedLoader::default()
            .with("/srv/shipments.json", b"[]")
            .with("/srv/shipments.csv", SHEET);

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert_eq!(res.source, SourceKind::Spreadsheet);
        assert_eq!(res.records.len(), 1);
        assert_eq!(res.records[0].text(&["carrier"]).as_deref(), Some("Europillow"));
        assert_eq!(
            *loader.requested.borrow(),
            vec!["/srv/shipments.json", "/srv/shipments.csv"]
        );
    }

    #[test]
    fn everything_failing_yields_paste_prompt() {
        let config = config();
        let store = MemorySnapshotStore::new();
        let loader = CannedLoader::default().with("/srv/shipments.csv", b"no;header;here\n1;2;3\n");

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert_eq!(res, Resolution::empty());
        assert!(res.is_empty());
        assert_eq!(res.description, EMPTY_DESCRIPTION);
    }

    #[test]
    fn unset_locations_are_skipped() {
        let mut config = config();
        config.sources.json = None;
        config.sources.spreadsheet = None;
        let store = MemorySnapshotStore::new();
        let loader = CannedLoader::default();

        let res = Resolver::new(&config, &store, &loader).resolve();
        assert!(res.is_empty());
        assert!(loader.requested.borrow().is_empty());
    }

    #[test]
    fn paste_resolution() {
        let res = Resolution::from_paste(vec![ShipmentRaw::new().with("id", "P1")]);
        assert_eq!(res.source, SourceKind::Paste);
        assert_eq!(res.records.len(), 1);
    }
}
