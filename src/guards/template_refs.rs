//! G5: Template References Guard
//!
//! Every template id a rule or language names must exist in the registry's
//! template set. Syntax is already checked when the set is built.

use crate::error::RegistryError;
use crate::guards::{Guard, GuardContext, GuardResult};

pub struct TemplateRefsGuard;

impl Guard for TemplateRefsGuard {
    fn name(&self) -> &str {
        "G5: Template References"
    }

    fn description(&self) -> &str {
        "Checks referenced templates are defined"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for language in ctx.languages {
            if let Some(notes) = &language.notes {
                checked += 1;
                if !ctx.templates.contains(notes) {
                    violations.push(RegistryError::UnknownTemplate {
                        owner: format!("language `{}`", language.name),
                        field: "notes",
                        template: notes.to_string(),
                    });
                }
            }
            for rule in &language.rules {
                for (field, id) in rule.template_refs() {
                    checked += 1;
                    if !ctx.templates.contains(id) {
                        violations.push(RegistryError::UnknownTemplate {
                            owner: format!("rule `{}`", rule.name),
                            field,
                            template: id.to_string(),
                        });
                    }
                }
            }
        }

        GuardResult::from_violations(
            self.name(),
            violations,
            format!("{checked} template reference(s) resolved"),
            "Define the template in the template set or fix the reference",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, Rule, RuleKind};
    use crate::template::{TemplateId, TemplateSet};

    #[test]
    fn test_unknown_reference_fails() {
        let languages = vec![Language::new("go", "go", "Go")
            .notes(TemplateId::new("go_notes"))
            .rule(
                Rule::new("go_proto_compile", RuleKind::Proto)
                    .implementation(TemplateId::new("impl"))
                    .build_example(TemplateId::new("missing_build")),
            )];
        let templates = TemplateSet::builder()
            .template("impl", "x")
            .template("go_notes", "notes")
            .build()
            .unwrap();
        let result = TemplateRefsGuard.check(&GuardContext {
            languages: &languages,
            templates: &templates,
        });

        assert_eq!(
            result.violations,
            vec![RegistryError::UnknownTemplate {
                owner: "rule `go_proto_compile`".to_string(),
                field: "build_example",
                template: "missing_build".to_string(),
            }]
        );
    }
}
