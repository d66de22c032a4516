//! Container-level idempotence: duplicate snapshot keys and repeated
//! metadata writes must short-circuit without partial writes.

use tempfile::TempDir;

use spincorr::store::{GroupMeta, OutputStore};

fn meta() -> GroupMeta {
    GroupMeta {
        lattice_vectors: vec![[1.0, 0.0, 0.0]],
        basis: vec![[0.0, 0.0, 0.0]],
        sites: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        basis_count: 1,
        range_count: 2,
    }
}

#[test]
fn appending_duplicate_key_yields_exactly_one_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = OutputStore::new(dir.path().join("obs.bin"));

    store.append_snapshot("CorrelationsXX", 1.0, &[0.5, 0.25]).unwrap();
    store.append_snapshot("CorrelationsXX", 1.0, &[9.0, 9.0]).unwrap();

    assert_eq!(store.snapshot_count("CorrelationsXX").unwrap(), 1);
    let snapshot = store.snapshot("CorrelationsXX", 0).unwrap();
    assert_eq!(snapshot.cutoff, 1.0);
    assert_eq!(snapshot.data, vec![0.5, 0.25]);
}

#[test]
fn distinct_keys_append_sequentially() {
    let dir = TempDir::new().unwrap();
    let store = OutputStore::new(dir.path().join("obs.bin"));

    store.append_snapshot("CorrelationsDD", 1.0, &[1.0]).unwrap();
    store.append_snapshot("CorrelationsDD", 0.5, &[2.0]).unwrap();
    store.append_snapshot("CorrelationsDD", 0.25, &[3.0]).unwrap();

    assert_eq!(store.snapshot_count("CorrelationsDD").unwrap(), 3);
    for (index, cutoff) in [1.0, 0.5, 0.25].into_iter().enumerate() {
        let snapshot = store.snapshot("CorrelationsDD", index).unwrap();
        assert_eq!(snapshot.name, format!("measurement_{index}"));
        assert_eq!(snapshot.cutoff, cutoff);
    }
}

#[test]
fn metadata_write_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = OutputStore::new(dir.path().join("obs.bin"));

    store.ensure_metadata("CorrelationsYY", &meta()).unwrap();
    let mut changed = meta();
    changed.range_count = 7;
    store.ensure_metadata("CorrelationsYY", &changed).unwrap();

    assert_eq!(store.metadata("CorrelationsYY").unwrap(), Some(meta()));
}

#[test]
fn metadata_and_snapshots_coexist_per_group() {
    let dir = TempDir::new().unwrap();
    let store = OutputStore::new(dir.path().join("obs.bin"));

    store.ensure_metadata("CorrelationsZZ", &meta()).unwrap();
    store.append_snapshot("CorrelationsZZ", 0.9, &[1.0, 2.0]).unwrap();

    assert!(store.metadata("CorrelationsZZ").unwrap().is_some());
    assert_eq!(store.snapshot_count("CorrelationsZZ").unwrap(), 1);
    // Other groups stay untouched.
    assert!(store.metadata("CorrelationsXX").unwrap().is_none());
}
