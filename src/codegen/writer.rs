//! Persisting an [`OutputTree`] under an output root.
//!
//! Writes are atomic per file (temp file in the target directory, then
//! rename). In check mode nothing is written; every missing or drifted file
//! is reported with a unified diff instead.

use super::layout::OutputTree;
use anyhow::{Context, Result, anyhow};
use similar::TextDiff;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    Check,
}

/// A file whose on-disk content differs from the generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub path: PathBuf,
    /// File does not exist at all
    pub missing: bool,
    pub diff: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    /// Only populated in check mode
    pub drifted: Vec<Drift>,
}

impl WriteReport {
    pub fn is_clean(&self) -> bool {
        self.drifted.is_empty()
    }
}

/// Writes or checks output trees under a fixed root.
#[derive(Debug, Clone)]
pub struct TreeWriter {
    root: PathBuf,
    mode: WriteMode,
}

impl TreeWriter {
    pub fn new(root: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    /// Every path is validated and every existing file read before the
    /// first write, so a rejected tree leaves the output root untouched.
    pub fn apply(&self, tree: &OutputTree) -> Result<WriteReport> {
        for (relative, _) in tree.iter() {
            validate_relative(relative)?;
        }

        let planned = tree
            .iter()
            .map(|(relative, content)| {
                let path = self.root.join(relative);
                let current = read_existing(&path)?;
                Ok((relative, path, content, current))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = WriteReport::default();

        for (relative, path, content, current) in planned {
            if current.as_deref() == Some(content) {
                report.unchanged.push(relative.to_path_buf());
                continue;
            }

            match self.mode {
                WriteMode::Write => {
                    atomic_write(&path, content)?;
                    tracing::debug!(path = %relative.display(), "wrote file");
                    report.written.push(relative.to_path_buf());
                }
                WriteMode::Check => {
                    let drift = Drift {
                        path: relative.to_path_buf(),
                        missing: current.is_none(),
                        diff: unified_diff(relative, current.as_deref().unwrap_or(""), content),
                    };
                    tracing::warn!(
                        path = %relative.display(),
                        missing = drift.missing,
                        "generated file is out of date"
                    );
                    report.drifted.push(drift);
                }
            }
        }

        tracing::info!(
            root = %self.root.display(),
            mode = ?self.mode,
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            drifted = report.drifted.len(),
            "output tree applied"
        );
        Ok(report)
    }
}

/// Reject anything that could escape the output root.
fn validate_relative(path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(anyhow!("refusing to write outside the output root: {:?}", path));
    }
    Ok(())
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.flush()?;
    temp_file
        .persist(path)
        .with_context(|| format!("failed to persist {}", path.display()))?;
    Ok(())
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let name = path.display().to_string();
    let diff = TextDiff::from_lines(old, new);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> OutputTree {
        let mut tree = OutputTree::default();
        tree.insert("go/defs.bzl", "a\nb\n");
        tree.insert("example/go/rule/WORKSPACE", "ws\n");
        tree
    }

    #[test]
    fn test_write_creates_nested_files() {
        let dir = TempDir::new().unwrap();
        let report = TreeWriter::new(dir.path(), WriteMode::Write).apply(&tree()).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("example/go/rule/WORKSPACE")).unwrap(),
            "ws\n"
        );
    }

    #[test]
    fn test_second_write_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let writer = TreeWriter::new(dir.path(), WriteMode::Write);
        writer.apply(&tree()).unwrap();
        let report = writer.apply(&tree()).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.unchanged.len(), 2);
    }

    #[test]
    fn test_check_reports_drift_without_writing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("go")).unwrap();
        fs::write(dir.path().join("go/defs.bzl"), "a\nc\n").unwrap();

        let report = TreeWriter::new(dir.path(), WriteMode::Check).apply(&tree()).unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.drifted.len(), 2);
        let defs = report
            .drifted
            .iter()
            .find(|d| d.path == Path::new("go/defs.bzl"))
            .unwrap();
        assert!(!defs.missing);
        assert!(defs.diff.contains("-c\n"));
        assert!(defs.diff.contains("+b\n"));
        assert!(!dir.path().join("example").exists());
        assert_eq!(fs::read_to_string(dir.path().join("go/defs.bzl")).unwrap(), "a\nc\n");
    }

    #[test]
    fn test_parent_segments_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut tree = OutputTree::default();
        tree.insert("../escape.bzl", "x");
        assert!(TreeWriter::new(dir.path(), WriteMode::Write).apply(&tree).is_err());
    }

    #[test]
    fn test_rejected_tree_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("out");
        let mut tree = OutputTree::default();
        tree.insert(".bazelci/presubmit.yml", "tasks: {}\n");
        tree.insert("go/../../escape.bzl", "x");
        tree.insert("go/defs.bzl", "y");

        let err = TreeWriter::new(&root, WriteMode::Write).apply(&tree).unwrap_err();
        assert!(err.to_string().contains("outside the output root"));
        assert!(!root.exists());
        assert!(!dir.path().join("escape.bzl").exists());
    }
}
