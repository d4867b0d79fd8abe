//! End-to-end generation runs against a temporary output root.

use proto_rulegen::codegen::{GenerationReceipt, PRESUBMIT_PATH, WriteMode};
use proto_rulegen::{GeneratorConfig, run};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn config(root: &TempDir, mode: WriteMode) -> GeneratorConfig {
    GeneratorConfig {
        output_root: root.path().to_path_buf(),
        languages: None,
        mode,
        receipt: None,
    }
}

#[test]
fn test_write_then_check_is_clean() {
    let root = TempDir::new().unwrap();

    let written = run(&config(&root, WriteMode::Write)).unwrap();
    assert!(!written.report.written.is_empty());
    assert!(root.path().join("python/python_proto_compile.bzl").is_file());
    assert!(root.path().join("csharp/README.md").is_file());
    assert!(root.path().join(PRESUBMIT_PATH).is_file());

    let checked = run(&config(&root, WriteMode::Check)).unwrap();
    assert!(checked.report.is_clean());
    assert_eq!(checked.report.unchanged.len(), written.report.written.len());
}

#[test]
fn test_check_detects_hand_edits() {
    let root = TempDir::new().unwrap();
    run(&config(&root, WriteMode::Write)).unwrap();

    let edited = root.path().join("python/defs.bzl");
    fs::write(&edited, "# hand edited\n").unwrap();
    fs::remove_file(root.path().join("csharp/defs.bzl")).unwrap();

    let report = run(&config(&root, WriteMode::Check)).unwrap().report;
    let paths: Vec<_> = report.drifted.iter().map(|d| d.path.clone()).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("csharp/defs.bzl"), PathBuf::from("python/defs.bzl")]
    );
    assert!(report.drifted[0].missing);
    assert!(report.drifted[1].diff.contains("-# hand edited"));
    assert_eq!(fs::read_to_string(&edited).unwrap(), "# hand edited\n");
}

#[test]
fn test_language_selection_limits_output() {
    let root = TempDir::new().unwrap();
    let config = GeneratorConfig {
        languages: Some(vec!["csharp".to_string()]),
        ..config(&root, WriteMode::Write)
    };
    run(&config).unwrap();

    assert!(root.path().join("csharp/defs.bzl").is_file());
    assert!(!root.path().join("python").exists());
    let presubmit = fs::read_to_string(root.path().join(PRESUBMIT_PATH)).unwrap();
    assert!(presubmit.contains("\"//csharp/...\""));
    assert!(!presubmit.contains("python"));
}

#[test]
fn test_unknown_language_fails_run() {
    let root = TempDir::new().unwrap();
    let config = GeneratorConfig {
        languages: Some(vec!["cobol".to_string()]),
        ..config(&root, WriteMode::Write)
    };
    let err = run(&config).unwrap_err();
    assert!(err.to_string().contains("cobol"));
}

#[test]
fn test_receipt_is_saved_and_verifies() {
    let root = TempDir::new().unwrap();
    let receipt_path = root.path().join("receipt.json");
    let config = GeneratorConfig {
        receipt: Some(receipt_path.clone()),
        ..config(&root, WriteMode::Write)
    };

    let outcome = run(&config).unwrap();
    let saved = GenerationReceipt::load(&receipt_path).unwrap();
    assert!(saved.verify());
    assert_eq!(Some(&saved), outcome.receipt.as_ref());
    assert!(saved.files.contains_key("python/python_grpc_library.bzl"));

    let checked = run(&GeneratorConfig {
        mode: WriteMode::Check,
        ..config
    })
    .unwrap();
    assert_eq!(checked.receipt.map(|r| r.receipt_id), Some(saved.receipt_id));
}
