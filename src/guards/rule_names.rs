//! G2: Rule Names Guard
//!
//! Rule names key the artifact catalog across *all* languages, so two rules
//! anywhere in the registry must never share a name. They also become file
//! and directory names and Starlark identifiers in `defs.bzl`, so each must
//! match `[A-Za-z_][A-Za-z0-9_]*`.

use crate::error::RegistryError;
use crate::guards::{Guard, GuardContext, GuardResult};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

pub struct RuleNamesGuard;

impl RuleNamesGuard {
    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl Guard for RuleNamesGuard {
    fn name(&self) -> &str {
        "G2: Rule Names"
    }

    fn description(&self) -> &str {
        "Checks rule names are identifiers and unique across the registry"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut violations = Vec::new();
        let mut total = 0usize;

        for language in ctx.languages {
            for rule in &language.rules {
                total += 1;
                if !Self::is_identifier(&rule.name) {
                    violations.push(RegistryError::InvalidRuleName {
                        language: language.name.clone(),
                        rule: rule.name.clone(),
                    });
                }
                match owners.entry(rule.name.as_str()) {
                    Entry::Occupied(first) => {
                        violations.push(RegistryError::DuplicateRuleName {
                            rule: rule.name.clone(),
                            first_language: first.get().to_string(),
                            second_language: language.name.clone(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(language.name.as_str());
                    }
                }
            }
        }

        GuardResult::from_violations(
            self.name(),
            violations,
            format!("{total} unique rule name(s)"),
            "Name every rule with letters, digits and underscores, unique across every language",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, Rule, RuleKind};
    use crate::template::TemplateSet;

    #[test]
    fn test_duplicate_across_languages_fails() {
        let languages = vec![
            Language::new("a", "a", "A").rule(Rule::new("foo_proto_compile", RuleKind::Proto)),
            Language::new("b", "b", "B").rule(Rule::new("foo_proto_compile", RuleKind::Proto)),
            Language::new("c", "c", "C").rule(Rule::new("foo_proto_compile", RuleKind::Proto)),
        ];
        let templates = TemplateSet::builder().build().unwrap();
        let result = RuleNamesGuard.check(&GuardContext {
            languages: &languages,
            templates: &templates,
        });

        assert!(result.is_fail());
        assert_eq!(
            result.violations,
            vec![
                RegistryError::DuplicateRuleName {
                    rule: "foo_proto_compile".to_string(),
                    first_language: "a".to_string(),
                    second_language: "b".to_string(),
                },
                RegistryError::DuplicateRuleName {
                    rule: "foo_proto_compile".to_string(),
                    first_language: "a".to_string(),
                    second_language: "c".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_path_like_rule_names_fail() {
        let languages = vec![Language::new("go", "go", "Go")
            .rule(Rule::new("../../escape", RuleKind::Proto))
            .rule(Rule::new("nested/rule", RuleKind::Proto))
            .rule(Rule::new("9lives", RuleKind::Proto))
            .rule(Rule::new("", RuleKind::Proto))
            .rule(Rule::new("_go_proto_compile2", RuleKind::Proto))];
        let templates = TemplateSet::builder().build().unwrap();
        let result = RuleNamesGuard.check(&GuardContext {
            languages: &languages,
            templates: &templates,
        });

        let invalid: Vec<_> = result
            .violations
            .iter()
            .filter_map(|v| match v {
                RegistryError::InvalidRuleName { rule, .. } => Some(rule.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(invalid, vec!["../../escape", "nested/rule", "9lives", ""]);
    }

    #[test]
    fn test_duplicate_within_language_fails() {
        let languages = vec![Language::new("a", "a", "A")
            .rule(Rule::new("x", RuleKind::Proto))
            .rule(Rule::new("x", RuleKind::Grpc))];
        let templates = TemplateSet::builder().build().unwrap();
        let result = RuleNamesGuard.check(&GuardContext {
            languages: &languages,
            templates: &templates,
        });
        assert_eq!(result.violations.len(), 1);
    }
}
