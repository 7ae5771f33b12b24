use std::fs;

use search_harvester::{ensure_output_dir, AtomicFileWriter, PageStore};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("pages");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("records.csv", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "records.csv");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("records.csv", b"world".as_slice()).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("records.csv", "data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("records.csv").exists());
}

#[test]
fn page_store_writes_pretty_json_per_page() {
    let temp = TempDir::new().unwrap();
    let store = PageStore::new(temp.path().join("pages"), "modern_love");
    let document = json!({ "response": { "meta": { "hits": 1 }, "docs": [] } });

    let path = store.save(4, &document).unwrap();
    assert_eq!(path.file_name().unwrap(), "modern_love_04.json");

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains('\n'));
    let reread: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reread, document);
}
