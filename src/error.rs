//! Error taxonomy for a generation run.
//!
//! Every error here stems from a static authoring mistake (a bad registry
//! entry or a bad template), so none of them are retryable: a run either
//! produces a complete catalog or fails with one of these.

use std::fmt;
use thiserror::Error;

/// Structural invariant violated while building the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("rule name `{rule}` is declared by both `{first_language}` and `{second_language}`")]
    DuplicateRuleName {
        rule: String,
        first_language: String,
        second_language: String,
    },

    #[error("rule name `{rule}` of language `{language}` is not a Starlark identifier")]
    InvalidRuleName { language: String, rule: String },

    #[error("language {field} `{value}` is declared more than once")]
    DuplicateLanguage { field: &'static str, value: String },

    #[error("language `{language}` has invalid directory `{dir}`: {reason}")]
    InvalidLanguageDir {
        language: String,
        dir: String,
        reason: String,
    },

    #[error("language `{language}` declares no rules")]
    EmptyLanguage { language: String },

    #[error("grpc rule `{rule}` of language `{language}` declares no plugins")]
    GrpcRuleWithoutPlugins { language: String, rule: String },

    #[error("rule `{rule}` of language `{language}` has no implementation template")]
    MissingImplementation { language: String, rule: String },

    #[error("{owner} references unknown template `{template}` via `{field}`")]
    UnknownTemplate {
        owner: String,
        field: &'static str,
        template: String,
    },

    #[error("invalid skip-test platform list {tokens:?}: {reason}")]
    InvalidSkipPolicy { tokens: Vec<String>, reason: String },

    #[error("language `{language}` is not in the registry")]
    UnknownLanguage { language: String },
}

/// A template whose source cannot be turned into a usable template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template `{template}` is invalid: {message}")]
pub struct TemplateDefinitionError {
    pub template: String,
    pub message: String,
}

/// Where a render happened, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderSite {
    pub language: Option<String>,
    pub rule: Option<String>,
    pub artifact: String,
}

impl RenderSite {
    pub fn rule(language: &str, rule: &str, artifact: impl Into<String>) -> Self {
        Self {
            language: Some(language.to_string()),
            rule: Some(rule.to_string()),
            artifact: artifact.into(),
        }
    }

    pub fn language(language: &str, artifact: impl Into<String>) -> Self {
        Self {
            language: Some(language.to_string()),
            rule: None,
            artifact: artifact.into(),
        }
    }

    pub fn registry(artifact: impl Into<String>) -> Self {
        Self {
            language: None,
            rule: None,
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for RenderSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.artifact)?;
        if let Some(rule) = &self.rule {
            write!(f, " of rule `{rule}`")?;
        }
        if let Some(language) = &self.language {
            write!(f, " in language `{language}`")?;
        }
        Ok(())
    }
}

/// A template could not be instantiated against its context, typically
/// because it references a field the context does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to render {site} with template `{template}`: {message}")]
pub struct BindingError {
    pub site: RenderSite,
    pub template: String,
    pub message: String,
}

/// Umbrella error for a whole generation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    TemplateDefinition(#[from] TemplateDefinitionError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Rendered output failed a structural check, e.g. YAML that does not parse.
    #[error("generated `{path}` is malformed: {message}")]
    MalformedOutput { path: String, message: String },
}

/// Flatten a Tera error and its sources into one line; Tera keeps the useful
/// part ("Variable `x` not found") in the source chain.
pub(crate) fn describe_tera_error(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_site_display_names_every_coordinate() {
        let site = RenderSite::rule("python", "python_grpc_library", "implementation");
        assert_eq!(
            site.to_string(),
            "implementation of rule `python_grpc_library` in language `python`"
        );
        assert_eq!(RenderSite::registry("presubmit").to_string(), "presubmit");
    }

    #[test]
    fn test_generation_error_is_transparent() {
        let err: GenerationError = RegistryError::EmptyLanguage {
            language: "go".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "language `go` declares no rules");
    }
}
