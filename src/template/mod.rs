//! Template definitions and rendering.
//!
//! Templates are Tera sources registered under a [`TemplateId`]. The whole
//! set is assembled once, before any rendering, by [`TemplateSetBuilder`]:
//!
//! - **Composition**: a template may be the concatenation of earlier ones
//!   (a shared library base plus a per-kind suffix). Composition happens here,
//!   at definition time, never per language.
//! - **Syntax check**: every source is parsed in [`TemplateSetBuilder::build`],
//!   so an authoring mistake fails the run immediately rather than only when
//!   some language happens to render the broken template.
//!
//! - **Field references**: every identifier a template reads, including in
//!   conditions, tests and filter arguments, is recorded for checking against
//!   each render context.
//!
//! The resulting [`TemplateSet`] is immutable and rendered through
//! [`Renderer`], which treats any undefined variable as a hard error.

pub mod context;
mod references;
pub mod renderer;

pub use context::{DocumentationContext, LangView, LanguageContext, RuleContext, RuleView};
pub use renderer::Renderer;

use crate::error::{TemplateDefinitionError, describe_tera_error};
use indexmap::IndexMap;
use references::FieldRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use tera::{Context, Tera};

/// Name of a template inside a [`TemplateSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(Cow<'static, str>);

impl TemplateId {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TemplateId {
    fn from(id: &'static str) -> Self {
        TemplateId::from_static(id)
    }
}

// =============================================================================
// Template Set
// =============================================================================

/// Immutable, syntax-checked lookup table of templates.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    tera: Tera,
    sources: IndexMap<TemplateId, String>,
    references: IndexMap<TemplateId, Vec<FieldRef>>,
}

impl TemplateSet {
    pub fn builder() -> TemplateSetBuilder {
        TemplateSetBuilder::default()
    }

    pub fn contains(&self, id: &TemplateId) -> bool {
        self.sources.contains_key(id)
    }

    /// Source text after composition.
    pub fn source(&self, id: &TemplateId) -> Option<&str> {
        self.sources.get(id).map(String::as_str)
    }

    /// Templates in definition order.
    pub fn sources(&self) -> impl Iterator<Item = (&TemplateId, &str)> {
        self.sources.iter().map(|(id, src)| (id, src.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First field `id` reads that `context` does not define.
    pub(crate) fn unresolved(&self, id: &TemplateId, context: &Value) -> Option<&str> {
        self.references
            .get(id)?
            .iter()
            .find(|field| !field.resolves(context))
            .map(FieldRef::as_str)
    }

    pub(crate) fn render(&self, id: &TemplateId, context: &Context) -> tera::Result<String> {
        self.tera.render(id.as_str(), context)
    }
}

/// Collects template sources, composes them, and parses them all in `build`.
#[derive(Debug, Default)]
pub struct TemplateSetBuilder {
    sources: IndexMap<TemplateId, String>,
    errors: Vec<TemplateDefinitionError>,
}

impl TemplateSetBuilder {
    /// Define a template from source text.
    pub fn template(mut self, id: impl Into<TemplateId>, source: impl Into<String>) -> Self {
        self.define(id.into(), source.into());
        self
    }

    /// Define a template as the concatenation of previously defined ones.
    pub fn compose<'a, I>(mut self, id: impl Into<TemplateId>, parts: I) -> Self
    where
        I: IntoIterator<Item = &'a TemplateId>,
    {
        let id = id.into();
        let mut source = String::new();
        for part in parts {
            match self.sources.get(part) {
                Some(part_source) => source.push_str(part_source),
                None => {
                    self.errors.push(TemplateDefinitionError {
                        template: id.to_string(),
                        message: format!("composed from undefined template `{part}`"),
                    });
                    return self;
                }
            }
        }
        self.define(id, source);
        self
    }

    fn define(&mut self, id: TemplateId, source: String) {
        if self.sources.contains_key(&id) {
            self.errors.push(TemplateDefinitionError {
                template: id.to_string(),
                message: "defined more than once".to_string(),
            });
            return;
        }
        self.sources.insert(id, source);
    }

    /// Parse every template. The first definition error wins.
    pub fn build(self) -> Result<TemplateSet, TemplateDefinitionError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let mut tera = Tera::default();
        // Output is Starlark, Markdown and YAML; never HTML-escape.
        tera.autoescape_on(vec![]);

        for (id, source) in &self.sources {
            tera.add_raw_template(id.as_str(), source)
                .map_err(|e| TemplateDefinitionError {
                    template: id.to_string(),
                    message: describe_tera_error(&e),
                })?;
        }

        let mut references = IndexMap::with_capacity(self.sources.len());
        for id in self.sources.keys() {
            let template = tera
                .get_template(id.as_str())
                .map_err(|e| TemplateDefinitionError {
                    template: id.to_string(),
                    message: describe_tera_error(&e),
                })?;
            references.insert(id.clone(), references::collect(&template.ast));
        }

        tracing::debug!(templates = self.sources.len(), "template set built");

        Ok(TemplateSet {
            tera,
            sources: self.sources,
            references,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_concatenates_in_order() {
        let base = TemplateId::new("base");
        let suffix = TemplateId::new("suffix");
        let set = TemplateSet::builder()
            .template(base.clone(), "load(x)\n")
            .template(suffix.clone(), "library(y)")
            .compose("library", [&base, &suffix])
            .build()
            .unwrap();

        assert_eq!(
            set.source(&TemplateId::new("library")),
            Some("load(x)\nlibrary(y)")
        );
        let ids: Vec<_> = set.sources().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["base", "suffix", "library"]);
    }

    #[test]
    fn test_compose_with_undefined_part_fails() {
        let err = TemplateSet::builder()
            .compose("library", [&TemplateId::new("missing")])
            .build()
            .unwrap_err();
        assert_eq!(err.template, "library");
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_syntax_error_detected_at_build() {
        let err = TemplateSet::builder()
            .template("ok", "{{ lang.name }}")
            .template("bad", "{% if unclosed")
            .build()
            .unwrap_err();
        assert_eq!(err.template, "bad");
    }

    #[test]
    fn test_duplicate_definition_fails() {
        let err = TemplateSet::builder()
            .template("a", "one")
            .template("a", "two")
            .build()
            .unwrap_err();
        assert!(err.message.contains("more than once"));
    }
}
