mod support;

use std::fs;

use donation_core::{Amount, DonationRecord, TrackedSet};
use donation_engine::{ensure_output_dir, AtomicFileWriter, JsonStateStore, StateStore};
use pretty_assertions::assert_eq;
use support::{donation, init_logging};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("tracked.json", "[]").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "[]");

    let second = writer.write("tracked.json", "[1]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "[1]");

    let leftovers = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 1, "temp files are renamed, not left behind");
}

#[test]
fn failed_write_leaves_no_partial_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("tracked.json", "data").is_err());
    assert!(!file_path.with_file_name("tracked.json").exists());
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "x");
}

#[test]
fn missing_state_file_loads_empty() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = JsonStateStore::new(temp.path().join("tracked_donations.json"));
    assert!(store.load().is_empty());
}

#[test]
fn save_then_load_round_trips_multiline_messages_and_order() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = JsonStateStore::new(temp.path().join("tracked_donations.json"));
    let tracked = TrackedSet::from_records([
        DonationRecord::new("Zoë", "Zürich", Amount::from_cents(2_501), "line 1\n\nline \"3\""),
        donation("A", 10_000),
        DonationRecord::new("Anonymous", "", Amount::from_dollars(1_000), ""),
    ]);

    store.save(&tracked).unwrap();
    let loaded = store.load();

    assert_eq!(loaded, tracked);
}

#[test]
fn saved_file_uses_decimal_strings_for_amounts() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracked_donations.json");
    let store = JsonStateStore::new(&path);
    store.save(&TrackedSet::from_records([donation("A", 2_550)])).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["donor_name"], "A");
    assert_eq!(raw[0]["amount"], "25.50");
}

#[test]
fn save_creates_parent_directory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("tracked_donations.json");
    JsonStateStore::new(&path).save(&TrackedSet::new()).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
}

#[test]
fn legacy_array_layout_is_still_readable() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracked_donations.json");
    fs::write(
        &path,
        r#"[["Ada", "London", 50.0, "Nets!\nMore nets"], ["Bo", "Oslo", 25.1, ""]]"#,
    )
    .unwrap();

    let loaded = JsonStateStore::new(&path).load();

    assert_eq!(
        loaded.records(),
        &[
            DonationRecord::new("Ada", "London", Amount::from_dollars(50), "Nets!\nMore nets"),
            DonationRecord::new("Bo", "Oslo", Amount::from_cents(2_510), ""),
        ]
    );
}

#[test]
fn corrupt_state_loads_empty_and_is_kept_aside() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracked_donations.json");
    fs::write(&path, "{ not json").unwrap();

    let loaded = JsonStateStore::new(&path).load();

    assert!(loaded.is_empty());
    let aside = temp.path().join("tracked_donations.json.corrupt");
    assert_eq!(fs::read_to_string(aside).unwrap(), "{ not json");
}

#[test]
fn duplicate_entries_in_file_collapse_on_load() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tracked_donations.json");
    let store = JsonStateStore::new(&path);
    let record = donation("A", 5_000);
    let doubled = serde_json::to_string(&vec![record.clone(), record.clone()]).unwrap();
    fs::write(&path, doubled).unwrap();

    assert_eq!(store.load().records(), &[record]);
}
