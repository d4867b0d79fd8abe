//! G4: Implementation Guard
//!
//! The implementation artifact is mandatory, so a rule without an
//! implementation template is rejected here rather than leaving a gap in the
//! catalog.

use crate::error::RegistryError;
use crate::guards::{Guard, GuardContext, GuardResult};

pub struct ImplementationGuard;

impl Guard for ImplementationGuard {
    fn name(&self) -> &str {
        "G4: Implementation"
    }

    fn description(&self) -> &str {
        "Checks every rule has an implementation template"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        let mut violations = Vec::new();
        for language in ctx.languages {
            for rule in language.rules.iter().filter(|r| r.implementation.is_none()) {
                violations.push(RegistryError::MissingImplementation {
                    language: language.name.clone(),
                    rule: rule.name.clone(),
                });
            }
        }

        GuardResult::from_violations(
            self.name(),
            violations,
            "all rules have an implementation template",
            "Set `implementation` on the rule",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, Rule, RuleKind};
    use crate::template::{TemplateId, TemplateSet};
    use assert_matches::assert_matches;

    #[test]
    fn test_missing_implementation_fails() {
        let languages = vec![Language::new("go", "go", "Go")
            .rule(Rule::new("go_proto_compile", RuleKind::Proto).implementation(TemplateId::new("t")))
            .rule(Rule::new("go_proto_library", RuleKind::Proto))];
        let templates = TemplateSet::builder().build().unwrap();
        let result = ImplementationGuard.check(&GuardContext {
            languages: &languages,
            templates: &templates,
        });

        assert_matches!(
            result.violations.as_slice(),
            [RegistryError::MissingImplementation { rule, .. }] if rule == "go_proto_library"
        );
    }
}
