//! Artifact catalog assembly.
//!
//! For every rule of every language, resolve its effective configuration,
//! render each artifact kind it has a template for, and store the text under
//! `(language, rule, kind)`. The catalog is total over the registry and is
//! only ever produced whole: any failure fails the run.

use crate::error::{GenerationError, RegistryError, RenderSite};
use crate::logging::{language_span, operation_span, rule_span};
use crate::model::{Language, Rule};
use crate::registry::Registry;
use crate::resolver::resolve;
use crate::template::{DocumentationContext, Renderer, RuleContext, TemplateId};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumIter};

/// Kinds of per-rule artifacts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ArtifactKind {
    Implementation,
    WorkspaceExample,
    BuildExample,
    Documentation,
}

impl ArtifactKind {
    /// The template a rule declares for this kind, if any.
    pub fn template_of(self, rule: &Rule) -> Option<&TemplateId> {
        match self {
            ArtifactKind::Implementation => rule.implementation.as_ref(),
            ArtifactKind::WorkspaceExample => rule.workspace_example.as_ref(),
            ArtifactKind::BuildExample => rule.build_example.as_ref(),
            ArtifactKind::Documentation => rule.documentation.as_ref(),
        }
    }
}

/// Logical identity of one artifact; mapping it to a file is the writer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub language: String,
    pub rule: String,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(language: &str, rule: &str, kind: ArtifactKind) -> Self {
        Self {
            language: language.to_string(),
            rule: rule.to_string(),
            kind,
        }
    }
}

/// Every generated artifact of a run, in registry declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactCatalog {
    entries: IndexMap<ArtifactKey, String>,
}

impl ArtifactCatalog {
    pub fn get(&self, language: &str, rule: &str, kind: ArtifactKind) -> Option<&str> {
        self.entries
            .get(&ArtifactKey::new(language, rule, kind))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Entries of one kind for one language, in rule order.
    pub fn of_kind<'a>(
        &'a self,
        language: &'a str,
        kind: ArtifactKind,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.language == language && k.kind == kind)
            .map(|(k, v)| (k.rule.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 over every key and text, in order.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, text) in &self.entries {
            hasher.update(key.language.as_bytes());
            hasher.update([0]);
            hasher.update(key.rule.as_bytes());
            hasher.update([0]);
            hasher.update(key.kind.as_ref().as_bytes());
            hasher.update([0]);
            hasher.update(text.len().to_le_bytes());
            hasher.update(text.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn insert(&mut self, key: ArtifactKey, text: String) -> Result<(), RegistryError> {
        match self.entries.entry(key) {
            Entry::Occupied(slot) => Err(RegistryError::DuplicateRuleName {
                rule: slot.key().rule.clone(),
                first_language: slot.key().language.clone(),
                second_language: slot.key().language.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(text);
                Ok(())
            }
        }
    }
}

/// Run the full pipeline over a registry: resolve, render, collect.
pub fn generate(registry: &Registry) -> Result<ArtifactCatalog, GenerationError> {
    let _span = operation_span("generate_catalog").entered();
    let renderer = Renderer::new(registry.templates());
    let mut catalog = ArtifactCatalog::default();

    for language in registry.languages() {
        let _span = language_span(&language.name).entered();
        for rule in &language.rules {
            render_rule(&renderer, language, rule, &mut catalog)?;
        }
    }

    tracing::info!(
        artifacts = catalog.len(),
        digest = %catalog.digest(),
        "artifact catalog assembled"
    );
    Ok(catalog)
}

fn render_rule(
    renderer: &Renderer<'_>,
    language: &Language,
    rule: &Rule,
    catalog: &mut ArtifactCatalog,
) -> Result<(), GenerationError> {
    let _span = rule_span(&rule.name).entered();
    let effective = resolve(language, rule);
    let context = RuleContext::new(language, rule, &effective);
    let site = |kind: ArtifactKind| RenderSite::rule(&language.name, &rule.name, kind.to_string());

    let implementation = ArtifactKind::Implementation.template_of(rule).ok_or_else(|| {
        RegistryError::MissingImplementation {
            language: language.name.clone(),
            rule: rule.name.clone(),
        }
    })?;
    let implementation =
        renderer.render(implementation, &context, site(ArtifactKind::Implementation))?;

    let render_optional = |kind: ArtifactKind| -> Result<Option<String>, GenerationError> {
        kind.template_of(rule)
            .map(|template| renderer.render(template, &context, site(kind)))
            .transpose()
            .map_err(Into::into)
    };
    let workspace_example = render_optional(ArtifactKind::WorkspaceExample)?;
    let build_example = render_optional(ArtifactKind::BuildExample)?;

    let documentation = match &rule.documentation {
        Some(template) => {
            let doc_context = DocumentationContext {
                base: &context,
                workspace_example: workspace_example.as_deref(),
                build_example: build_example.as_deref(),
            };
            Some(renderer.render(template, &doc_context, site(ArtifactKind::Documentation))?)
        }
        None => None,
    };

    let rendered = [
        (ArtifactKind::Implementation, Some(implementation)),
        (ArtifactKind::WorkspaceExample, workspace_example),
        (ArtifactKind::BuildExample, build_example),
        (ArtifactKind::Documentation, documentation),
    ];
    for (kind, text) in rendered {
        if let Some(text) = text {
            catalog.insert(ArtifactKey::new(&language.name, &rule.name, kind), text)?;
        }
    }

    tracing::debug!(
        flags = effective.flags.len(),
        skipped_platforms = effective.skip_test_platforms.len(),
        "rule rendered"
    );
    Ok(())
}
