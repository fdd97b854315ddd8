use crate::config::ColumnConfig;
use crate::hydrology::Discharge;
use crate::io::csv::CsvStore;
use crate::io::sqlite::SqliteStore;
use anyhow::{Result, bail};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::Path;

// Bookkeeping for the keyed discharge write
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteStats {
    pub matched: usize,
    pub skipped: usize,
}

// Storage backend for the segment attribute table
pub enum NetworkStore {
    Csv(CsvStore),
    Sqlite(SqliteStore),
}

impl NetworkStore {
    /// Open a network table, picking the backend from the file extension.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Ok(NetworkStore::Csv(CsvStore::open(path)?)),
            "sqlite" | "gpkg" | "db" => Ok(NetworkStore::Sqlite(SqliteStore::open(path, table)?)),
            _ => bail!("Unsupported network table format: {:?}", path),
        }
    }

    /// Segment identifiers and drainage areas (km^2), in table order.
    pub fn drainage(&self, cols: &ColumnConfig) -> Result<(Vec<i64>, Vec<f64>)> {
        match self {
            NetworkStore::Csv(store) => store.drainage(cols),
            NetworkStore::Sqlite(store) => store.drainage(cols),
        }
    }

    /// Write the discharge pair onto every segment present in the join map.
    ///
    /// Segments missing from the map are logged and left unchanged.
    pub fn write_discharge(
        &mut self,
        cols: &ColumnConfig,
        map: &HashMap<i64, Discharge>,
        pb: &ProgressBar,
    ) -> Result<WriteStats> {
        match self {
            NetworkStore::Csv(store) => store.write_discharge(cols, map, pb),
            NetworkStore::Sqlite(store) => store.write_discharge(cols, map, pb),
        }
    }

    /// Enforce Q2 >= Qlow on every segment; returns the number repaired.
    pub fn repair_peaks(&mut self, cols: &ColumnConfig) -> Result<usize> {
        match self {
            NetworkStore::Csv(store) => store.repair_peaks(cols),
            NetworkStore::Sqlite(store) => store.repair_peaks(cols),
        }
    }

    /// Compute both stream power fields from slope and the written discharge.
    ///
    /// Must run after `repair_peaks`. Returns the number of segments updated.
    pub fn write_stream_power(&mut self, cols: &ColumnConfig, pb: &ProgressBar) -> Result<usize> {
        match self {
            NetworkStore::Csv(store) => store.write_stream_power(cols, pb),
            NetworkStore::Sqlite(store) => store.write_stream_power(cols, pb),
        }
    }

    /// Flush any in-memory state back to storage.
    pub fn finish(self) -> Result<()> {
        match self {
            NetworkStore::Csv(store) => store.save(),
            NetworkStore::Sqlite(_) => Ok(()),
        }
    }
}

/// Join map from segment identifier to its computed discharge pair.
pub fn discharge_map(segids: &[i64], discharges: &[Discharge]) -> HashMap<i64, Discharge> {
    debug_assert_eq!(segids.len(), discharges.len());
    segids
        .iter()
        .copied()
        .zip(discharges.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::Discharge;

    #[test]
    fn discharge_map_keys_by_segid() {
        let segids = [4, 7];
        let discharges = [
            Discharge { qlow: 1.0, q2: 2.0 },
            Discharge { qlow: 3.0, q2: 4.0 },
        ];
        let map = discharge_map(&segids, &discharges);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&4].qlow, 1.0);
        assert_eq!(map[&7].q2, 4.0);
    }

    #[test]
    fn duplicate_segids_keep_the_last_pair() {
        let segids = [4, 4];
        let discharges = [
            Discharge { qlow: 1.0, q2: 2.0 },
            Discharge { qlow: 3.0, q2: 4.0 },
        ];
        let map = discharge_map(&segids, &discharges);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&4].qlow, 3.0);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = NetworkStore::open(Path::new("network.shp"), "network");
        assert!(err.is_err());
    }
}
