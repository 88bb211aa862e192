use super::*;
use crate::test_util::write_pdf;
use tempfile::TempDir;

#[test]
fn loads_pages_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("policy.pdf");
    write_pdf(
        &path,
        &["Retention policy overview", "", "Audit obligations apply"],
    );

    let pages = load_pdf(&path).expect("should load generated pdf");

    assert_eq!(pages.len(), 3);
    assert_eq!(
        pages.iter().map(|p| p.number).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(pages[0].text.contains("Retention policy overview"));
    assert!(pages[1].text.trim().is_empty());
    assert!(pages[2].text.contains("Audit obligations apply"));
}

#[test]
fn missing_file_is_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = load_pdf(&temp_dir.path().join("absent.pdf"));

    assert!(matches!(result, Err(VaultError::NotFound(_))));
}

#[test]
fn non_pdf_is_invalid_input() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("notes.pdf");
    std::fs::write(&path, "just some plain text").expect("should write file");

    let result = load_pdf(&path);

    assert!(matches!(result, Err(VaultError::InvalidInput(_))));
}
