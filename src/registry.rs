//! The closed, validated registry of languages, rules and templates.
//!
//! A [`Registry`] can only be obtained through [`Registry::new`], which runs
//! the guard kernel over the whole input before returning. Once built it is
//! never mutated; resolution and rendering only ever borrow it.

use crate::error::RegistryError;
use crate::guards::{GuardContext, GuardKernel};
use crate::model::{Language, Rule};
use crate::template::TemplateSet;

#[derive(Debug, Clone)]
pub struct Registry {
    languages: Vec<Language>,
    templates: TemplateSet,
}

impl Registry {
    /// Validate and seal the registry. Fails on the first structural
    /// violation; every violation is logged.
    pub fn new(languages: Vec<Language>, templates: TemplateSet) -> Result<Self, RegistryError> {
        let results = GuardKernel::default_suite().evaluate(&GuardContext {
            languages: &languages,
            templates: &templates,
        });

        if !results.all_passed() {
            tracing::error!(
                failures = results.failure_count(),
                summary = %results.remediation_summary(),
                "registry rejected"
            );
            results.into_result()?;
        }

        tracing::info!(
            languages = languages.len(),
            rules = languages.iter().map(|l| l.rules.len()).sum::<usize>(),
            templates = templates.len(),
            "registry constructed"
        );

        Ok(Self {
            languages,
            templates,
        })
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn language(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.name == name)
    }

    /// Every (language, rule) pair in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&Language, &Rule)> {
        self.languages
            .iter()
            .flat_map(|language| language.rules.iter().map(move |rule| (language, rule)))
    }

    /// A registry restricted to the named languages, in registry order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, RegistryError> {
        if let Some(unknown) = names
            .iter()
            .find(|name| self.language(name.as_ref()).is_none())
        {
            return Err(RegistryError::UnknownLanguage {
                language: unknown.as_ref().to_string(),
            });
        }

        let languages = self
            .languages
            .iter()
            .filter(|l| names.iter().any(|n| n.as_ref() == l.name))
            .cloned()
            .collect();
        Registry::new(languages, self.templates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuleKind, SkipPolicy};
    use crate::template::TemplateId;
    use assert_matches::assert_matches;

    fn templates() -> TemplateSet {
        TemplateSet::builder()
            .template("impl", "{{ rule.name }}")
            .build()
            .unwrap()
    }

    fn language(name: &str) -> Language {
        Language::new(name, name, name).rule(
            Rule::new(format!("{name}_proto_compile"), RuleKind::Proto)
                .implementation(TemplateId::new("impl")),
        )
    }

    #[test]
    fn test_valid_registry_builds() {
        let registry = Registry::new(vec![language("go"), language("python")], templates()).unwrap();
        assert_eq!(registry.languages().len(), 2);
        let names: Vec<_> = registry.rules().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, vec!["go_proto_compile", "python_proto_compile"]);
    }

    #[test]
    fn test_first_violation_is_reported() {
        let bad = Language::new("go", "go", "Go")
            .rule(Rule::new("go_grpc_compile", RuleKind::Grpc))
            .skip_test_platforms(SkipPolicy::All);
        let err = Registry::new(vec![bad], templates()).unwrap_err();
        // grpc plugins (G3) is checked before implementation (G4)
        assert_matches!(err, RegistryError::GrpcRuleWithoutPlugins { .. });
    }

    #[test]
    fn test_select_restricts_and_keeps_order() {
        let registry =
            Registry::new(vec![language("a"), language("b"), language("c")], templates()).unwrap();
        let selected = registry.select(&["c", "a"]).unwrap();
        let names: Vec<_> = selected.languages().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_select_unknown_language_fails() {
        let registry = Registry::new(vec![language("a")], templates()).unwrap();
        assert_matches!(
            registry.select(&["zig"]),
            Err(RegistryError::UnknownLanguage { language }) if language == "zig"
        );
    }
}
