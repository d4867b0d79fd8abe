//! Generation receipts: provenance for one run.
//!
//! A receipt ties the registry input (languages plus every template source)
//! to the catalog it produced and the files written from it. The receipt id
//! is a hash over those, so a tampered receipt no longer verifies.

use super::layout::OutputTree;
use crate::catalog::ArtifactCatalog;
use crate::registry::Registry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReceipt {
    pub receipt_id: String,
    /// Fingerprint of the languages and template sources
    pub input_hash: String,
    /// [`ArtifactCatalog::digest`]
    pub catalog_hash: String,
    /// Relative path to SHA-256 of its content
    pub files: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
    pub generator_version: String,
}

impl GenerationReceipt {
    pub fn new(registry: &Registry, catalog: &ArtifactCatalog, tree: &OutputTree) -> Result<Self> {
        let input_hash = registry_fingerprint(registry)?;
        let catalog_hash = catalog.digest();
        let files: BTreeMap<String, String> = tree
            .iter()
            .map(|(path, content)| {
                (
                    path.to_string_lossy().replace('\\', "/"),
                    compute_string_hash(content),
                )
            })
            .collect();
        let receipt_id = Self::generate_receipt_id(&input_hash, &catalog_hash, &files);

        Ok(Self {
            receipt_id,
            input_hash,
            catalog_hash,
            files,
            generated_at: Utc::now(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Deterministic over the hashes; the timestamp is not part of it.
    fn generate_receipt_id(
        input_hash: &str,
        catalog_hash: &str,
        files: &BTreeMap<String, String>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input_hash.as_bytes());
        hasher.update(catalog_hash.as_bytes());
        for (path, hash) in files {
            hasher.update(path.as_bytes());
            hasher.update([0]);
            hasher.update(hash.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn verify(&self) -> bool {
        self.receipt_id == Self::generate_receipt_id(&self.input_hash, &self.catalog_hash, &self.files)
    }

    /// Whether a fresh run over the same input produced the same catalog.
    pub fn is_reproducible(&self, catalog: &ArtifactCatalog) -> bool {
        self.catalog_hash == catalog.digest()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
            .with_context(|| format!("failed to write receipt {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read receipt {}", path.display()))?;
        let receipt: GenerationReceipt = serde_json::from_str(&content)?;
        Ok(receipt)
    }
}

/// SHA-256 over the serialized languages followed by every template source
/// in definition order.
pub fn registry_fingerprint(registry: &Registry) -> Result<String> {
    let languages = serde_json::to_vec(registry.languages())
        .context("failed to serialize registry languages")?;
    let mut hasher = Sha256::new();
    hasher.update(&languages);
    for (id, source) in registry.templates().sources() {
        hasher.update(id.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(source.as_bytes());
        hasher.update([0]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute SHA-256 hash of string
pub fn compute_string_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
