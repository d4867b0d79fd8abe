pub mod catalog;
pub mod codegen;
pub mod config;
pub mod error;
pub mod guards;
pub mod languages;
pub mod logging;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod template;

pub use catalog::{ArtifactCatalog, ArtifactKey, ArtifactKind, generate};
pub use config::{CliArgs, GeneratorConfig};
pub use error::{BindingError, GenerationError, RegistryError, RenderSite, TemplateDefinitionError};
pub use languages::builtin_registry;
pub use logging::{LoggingConfig, init_logging};
pub use model::{Attr, Flag, Language, Platform, Plugin, Rule, RuleKind, SkipPolicy};
pub use registry::Registry;
pub use resolver::{EffectiveConfig, resolve};
pub use template::{Renderer, TemplateId, TemplateSet};

use anyhow::{Context, Result};
use codegen::{GenerationReceipt, Layout, TreeWriter, WriteMode, WriteReport};
use std::time::Instant;

const SLOW_RUN_MS: u64 = 2_000;

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: WriteReport,
    pub receipt: Option<GenerationReceipt>,
}

/// Generate the built-in registry (or the configured subset of it) and write
/// or check it under the configured output root.
pub fn run(config: &GeneratorConfig) -> Result<RunOutcome> {
    let started = Instant::now();

    let registry = builtin_registry().context("built-in registry is invalid")?;
    let registry = match &config.languages {
        Some(names) => registry.select(names)?,
        None => registry,
    };

    let catalog = generate(&registry)?;
    let layout = Layout::new().context("layout templates are invalid")?;
    let tree = layout.assemble(&registry, &catalog)?;
    let report = TreeWriter::new(&config.output_root, config.mode).apply(&tree)?;

    let receipt = match (&config.receipt, config.mode) {
        (Some(path), WriteMode::Write) => {
            let receipt = GenerationReceipt::new(&registry, &catalog, &tree)?;
            receipt.save(path)?;
            tracing::info!(path = %path.display(), receipt_id = %receipt.receipt_id, "receipt saved");
            Some(receipt)
        }
        (Some(path), WriteMode::Check) if path.exists() => {
            let receipt = GenerationReceipt::load(path)?;
            if !receipt.verify() {
                tracing::warn!(path = %path.display(), "receipt does not verify");
            } else if !receipt.is_reproducible(&catalog) {
                tracing::warn!(path = %path.display(), "catalog differs from the receipt");
            }
            Some(receipt)
        }
        _ => None,
    };

    log_slow_operation!(started.elapsed(), SLOW_RUN_MS, "generation run finished");

    Ok(RunOutcome { report, receipt })
}
