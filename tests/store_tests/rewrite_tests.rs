//! Tests for the transactional rewriter
//!
//! These tests verify:
//! - Swap files live next to the target and vanish on abort
//! - Commit installs the new version atomically
//! - Handles opened before a commit keep the old version
//! - Store mutations leave no swap files behind

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use settingskv::record;
use settingskv::store::Rewrite;
use settingskv::{Config, DeleteRange, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_target() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.data");
    (temp_dir, path)
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Rewrite Lifecycle Tests
// =============================================================================

#[test]
fn test_swap_file_next_to_target() {
    let (temp, path) = setup_temp_target();

    let _rewrite = Rewrite::begin(&path).unwrap();

    let names = dir_entries(temp.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with(".store.data."));
    assert!(names[0].ends_with(".swap"));
    assert!(!path.exists());
}

#[test]
fn test_swap_paths_are_unique() {
    let (temp, path) = setup_temp_target();

    let _first = Rewrite::begin(&path).unwrap();
    let _second = Rewrite::begin(&path).unwrap();

    assert_eq!(dir_entries(temp.path()).len(), 2);
}

#[test]
fn test_abort_removes_swap_file() {
    let (temp, path) = setup_temp_target();

    {
        let mut rewrite = Rewrite::begin(&path).unwrap();
        rewrite.append(1, b"never installed").unwrap();
    }

    assert!(dir_entries(temp.path()).is_empty());
    assert!(!path.exists());
}

#[test]
fn test_commit_installs_records() {
    let (temp, path) = setup_temp_target();

    let mut rewrite = Rewrite::begin(&path).unwrap();
    rewrite.append(1, b"AB").unwrap();
    rewrite.append(2, b"").unwrap();
    rewrite.commit().unwrap();

    let mut expected = record::encode(1, b"AB").unwrap().to_vec();
    expected.extend_from_slice(&record::encode(2, b"").unwrap());
    assert_eq!(fs::read(&path).unwrap(), expected);
    assert_eq!(dir_entries(temp.path()), vec!["store.data".to_string()]);
}

#[test]
fn test_commit_returns_readable_handle() {
    let (_temp, path) = setup_temp_target();

    let mut rewrite = Rewrite::begin(&path).unwrap();
    rewrite.append(3, b"xyz").unwrap();
    let mut file = rewrite.commit().unwrap();

    let mut contents = Vec::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_end(&mut contents).unwrap();

    assert_eq!(contents, record::encode(3, b"xyz").unwrap().to_vec());
}

#[test]
fn test_old_handle_keeps_old_version() {
    let (_temp, path) = setup_temp_target();
    fs::write(&path, record::encode(1, b"old").unwrap()).unwrap();
    let mut old = File::open(&path).unwrap();

    let mut rewrite = Rewrite::begin(&path).unwrap();
    rewrite.append(1, b"new").unwrap();
    rewrite.commit().unwrap();

    let mut contents = Vec::new();
    old.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, record::encode(1, b"old").unwrap().to_vec());
    assert_eq!(fs::read(&path).unwrap(), record::encode(1, b"new").unwrap().to_vec());
}

#[test]
fn test_rejected_append_writes_nothing() {
    let (_temp, path) = setup_temp_target();

    let mut rewrite = Rewrite::begin(&path).unwrap();
    assert!(rewrite.append(1, &vec![0u8; 65_536]).is_err());
    rewrite.append(2, b"ok").unwrap();
    rewrite.commit().unwrap();

    assert_eq!(fs::read(&path).unwrap(), record::encode(2, b"ok").unwrap().to_vec());
}

// =============================================================================
// Store Integration Tests
// =============================================================================

#[test]
fn test_store_mutations_leave_no_swap_files() {
    let (temp, path) = setup_temp_target();
    let store = Store::open_path(&path).unwrap();

    store.add(1, b"a").unwrap();
    store.add(1, b"b").unwrap();
    store.set(2, b"c").unwrap();
    store.delete(1, DeleteRange::From(1)).unwrap();
    let _ = store.delete(9, DeleteRange::All);

    assert_eq!(dir_entries(temp.path()), vec!["store.data".to_string()]);
}

#[test]
fn test_single_byte_copy_chunks() {
    let (_temp, path) = setup_temp_target();
    let config = Config::builder()
        .store_path(&path)
        .copy_chunk_size(1)
        .build();
    let store = Store::open(config).unwrap();
    let big: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();

    store.add(1, &big).unwrap();
    store.add(2, b"tail").unwrap();
    store.delete(2, DeleteRange::All).unwrap();

    assert_eq!(store.get(1, 0).unwrap(), big);
}

#[test]
fn test_reads_follow_committed_version() {
    let (_temp, path) = setup_temp_target();
    let store = Store::open_path(&path).unwrap();

    store.add(1, b"v1").unwrap();
    store.set(1, b"v2").unwrap();

    // The handle moved onto the newly installed file
    assert_eq!(store.get(1, 0).unwrap(), b"v2");
    assert_eq!(store.count(1).unwrap(), 1);
}
