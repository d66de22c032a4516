//! Persisted observable container.
//!
//! A single self-describing binary file holds one top-level group per
//! observable. Each group carries lattice geometry metadata (written once)
//! and an append-only sequence of per-cutoff snapshots named
//! `measurement_<id>`, where `<id>` is the snapshot count at write time and
//! is never reused. Duplicate cutoff keys and repeated metadata writes are
//! logged and skipped with no partial writes. Writes are atomic (temp file +
//! rename).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StoreError;

/// Lattice geometry recorded once per observable group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMeta {
    /// Bravais lattice vectors.
    pub lattice_vectors: Vec<[f64; 3]>,
    /// Basis site positions.
    pub basis: Vec<[f64; 3]>,
    /// Positions of all range sites, row-major over (basis, range).
    pub sites: Vec<[f64; 3]>,
    pub basis_count: usize,
    pub range_count: usize,
}

/// One persisted measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Group-unique name, `measurement_<id>`.
    pub name: String,
    /// Flow parameter the data was computed at.
    pub cutoff: f64,
    /// Correlation buffer, row-major over (basis, range).
    pub data: Vec<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ObservableGroup {
    meta: Option<GroupMeta>,
    snapshots: Vec<Snapshot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Container {
    groups: BTreeMap<String, ObservableGroup>,
}

/// Append-only, deduplicating observable store backed by one file.
pub struct OutputStore {
    path: PathBuf,
}

impl OutputStore {
    /// Open a store at `path`. The file is created on the first write.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write lattice geometry metadata for `group`, once.
    ///
    /// If the group already carries metadata, the call logs a warning and
    /// writes nothing.
    pub fn ensure_metadata(&self, group: &str, meta: &GroupMeta) -> Result<(), StoreError> {
        let mut container = self.load()?;
        let entry = container.groups.entry(group.to_string()).or_default();
        if entry.meta.is_some() {
            warn!(
                group,
                "observable group already contains metadata, skipping write"
            );
            return Ok(());
        }
        entry.meta = Some(meta.clone());
        self.save(&container)
    }

    /// Append a snapshot for `cutoff` to `group`.
    ///
    /// If any existing snapshot in the group carries exactly this cutoff, the
    /// call logs a warning and writes nothing. Otherwise the snapshot is
    /// named `measurement_<id>` with `<id>` the current snapshot count.
    pub fn append_snapshot(&self, group: &str, cutoff: f64, data: &[f64]) -> Result<(), StoreError> {
        let mut container = self.load()?;
        let entry = container.groups.entry(group.to_string()).or_default();
        if entry.snapshots.iter().any(|s| s.cutoff == cutoff) {
            warn!(
                group,
                cutoff, "found existing measurement at this cutoff, discarding duplicate"
            );
            return Ok(());
        }
        let name = format!("measurement_{}", entry.snapshots.len());
        entry.snapshots.push(Snapshot {
            name,
            cutoff,
            data: data.to_vec(),
        });
        self.save(&container)
    }

    /// Metadata of `group`, if the group exists and has any.
    pub fn metadata(&self, group: &str) -> Result<Option<GroupMeta>, StoreError> {
        Ok(self
            .load()?
            .groups
            .get(group)
            .and_then(|g| g.meta.clone()))
    }

    /// Number of snapshots stored in `group`.
    pub fn snapshot_count(&self, group: &str) -> Result<usize, StoreError> {
        Ok(self
            .load()?
            .groups
            .get(group)
            .map(|g| g.snapshots.len())
            .unwrap_or(0))
    }

    /// Snapshot at `index` within `group`.
    pub fn snapshot(&self, group: &str, index: usize) -> Result<Snapshot, StoreError> {
        self.load()?
            .groups
            .get(group)
            .and_then(|g| g.snapshots.get(index).cloned())
            .ok_or_else(|| StoreError::GroupNotFound(format!("{group}[{index}]")))
    }

    fn load(&self) -> Result<Container, StoreError> {
        if !self.path.exists() {
            return Ok(Container::default());
        }
        let bytes = fs::read(&self.path)?;
        bincode::deserialize(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("failed to decode {:?}: {}", self.path, e)))
    }

    fn save(&self, container: &Container) -> Result<(), StoreError> {
        let bytes = bincode::serialize(container)
            .map_err(|e| StoreError::Corrupt(format!("failed to encode container: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, &bytes)?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            StoreError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta() -> GroupMeta {
        GroupMeta {
            lattice_vectors: vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            basis: vec![[0.0; 3]],
            sites: vec![[0.0; 3], [1.0, 0.0, 0.0]],
            basis_count: 1,
            range_count: 2,
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));

        store.append_snapshot("CorrelationsXX", 1.0, &[0.5, -0.5]).unwrap();
        let snap = store.snapshot("CorrelationsXX", 0).unwrap();
        assert_eq!(snap.name, "measurement_0");
        assert_eq!(snap.cutoff, 1.0);
        assert_eq!(snap.data, vec![0.5, -0.5]);
    }

    #[test]
    fn test_duplicate_cutoff_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));

        store.append_snapshot("CorrelationsXX", 1.0, &[1.0]).unwrap();
        store.append_snapshot("CorrelationsXX", 1.0, &[2.0]).unwrap();
        assert_eq!(store.snapshot_count("CorrelationsXX").unwrap(), 1);
        // The first write wins.
        assert_eq!(store.snapshot("CorrelationsXX", 0).unwrap().data, vec![1.0]);
    }

    #[test]
    fn test_snapshot_names_are_sequential() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));

        for (i, cutoff) in [1.0, 0.9, 0.8].iter().enumerate() {
            store.append_snapshot("CorrelationsZZ", *cutoff, &[0.0]).unwrap();
            let snap = store.snapshot("CorrelationsZZ", i).unwrap();
            assert_eq!(snap.name, format!("measurement_{i}"));
        }
    }

    #[test]
    fn test_metadata_written_once() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));

        store.ensure_metadata("CorrelationsXX", &meta()).unwrap();
        let mut other = meta();
        other.basis_count = 99;
        // Second write is a logged no-op; the original metadata survives.
        store.ensure_metadata("CorrelationsXX", &other).unwrap();
        assert_eq!(store.metadata("CorrelationsXX").unwrap(), Some(meta()));
    }

    #[test]
    fn test_groups_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));

        store.append_snapshot("CorrelationsXX", 1.0, &[1.0]).unwrap();
        store.append_snapshot("CorrelationsYY", 1.0, &[2.0]).unwrap();
        assert_eq!(store.snapshot_count("CorrelationsXX").unwrap(), 1);
        assert_eq!(store.snapshot_count("CorrelationsYY").unwrap(), 1);
        assert_eq!(store.snapshot_count("CorrelationsDD").unwrap(), 0);
    }

    #[test]
    fn test_corrupt_container_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("obs.bin");
        fs::write(&path, b"not a container").unwrap();

        let store = OutputStore::new(&path);
        assert!(matches!(
            store.snapshot_count("CorrelationsXX"),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_missing_snapshot_errors() {
        let dir = TempDir::new().unwrap();
        let store = OutputStore::new(dir.path().join("obs.bin"));
        assert!(matches!(
            store.snapshot("CorrelationsXX", 0),
            Err(StoreError::GroupNotFound(_))
        ));
    }
}
