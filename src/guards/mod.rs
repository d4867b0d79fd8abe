//! Registry guards: structural checks run once while building a
//! [`crate::registry::Registry`].
//!
//! - **G1: Language Identity** - unique names and dirs, safe dirs, no empty languages
//! - **G2: Rule Names** - rule names are identifiers, unique across the whole registry
//! - **G3: gRPC Plugins** - grpc rules declare plugins
//! - **G4: Implementation** - every rule has an implementation template
//! - **G5: Template References** - referenced templates exist
//!
//! Each guard is independent and reports every violation it finds; the
//! kernel runs them in order and the registry fails on the first violation.

pub mod grpc_plugins;
pub mod implementation;
pub mod language_identity;
pub mod rule_names;
pub mod template_refs;

use crate::error::RegistryError;
use crate::model::Language;
use crate::template::TemplateSet;

pub use grpc_plugins::GrpcPluginsGuard;
pub use implementation::ImplementationGuard;
pub use language_identity::LanguageIdentityGuard;
pub use rule_names::RuleNamesGuard;
pub use template_refs::TemplateRefsGuard;

// =============================================================================
// Core Guard Trait
// =============================================================================

/// One structural check over the registry input.
pub trait Guard: Send + Sync {
    /// Guard identifier (e.g., "G2: Rule Names")
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult;
}

/// What guards look at: the languages as declared and the template set they
/// reference.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub languages: &'a [Language],
    pub templates: &'a TemplateSet,
}

// =============================================================================
// Guard Result Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone)]
pub struct GuardResult {
    pub guard_name: String,
    pub verdict: Verdict,
    pub diagnostic: String,
    /// How to fix the registry, empty on pass
    pub remediation: String,
    pub violations: Vec<RegistryError>,
}

impl GuardResult {
    pub fn pass(guard_name: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            guard_name: guard_name.into(),
            verdict: Verdict::Pass,
            diagnostic: diagnostic.into(),
            remediation: String::new(),
            violations: Vec::new(),
        }
    }

    pub fn fail(
        guard_name: impl Into<String>,
        violations: Vec<RegistryError>,
        remediation: impl Into<String>,
    ) -> Self {
        let diagnostic = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            guard_name: guard_name.into(),
            verdict: Verdict::Fail,
            diagnostic,
            remediation: remediation.into(),
            violations,
        }
    }

    /// Pass when `violations` is empty, fail otherwise.
    pub fn from_violations(
        guard_name: &str,
        violations: Vec<RegistryError>,
        pass_diagnostic: impl Into<String>,
        remediation: &str,
    ) -> Self {
        if violations.is_empty() {
            Self::pass(guard_name, pass_diagnostic)
        } else {
            Self::fail(guard_name, violations, remediation)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.verdict, Verdict::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self.verdict, Verdict::Fail)
    }
}

// =============================================================================
// Guard Kernel (Orchestrator)
// =============================================================================

pub struct GuardKernel {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardKernel {
    pub fn new(guards: Vec<Box<dyn Guard>>) -> Self {
        Self { guards }
    }

    /// The checks every registry must pass, in reporting order.
    pub fn default_suite() -> Self {
        Self {
            guards: vec![
                Box::new(LanguageIdentityGuard),
                Box::new(RuleNamesGuard),
                Box::new(GrpcPluginsGuard),
                Box::new(ImplementationGuard),
                Box::new(TemplateRefsGuard),
            ],
        }
    }

    pub fn evaluate(&self, ctx: &GuardContext<'_>) -> GuardResults {
        let results = self
            .guards
            .iter()
            .map(|guard| {
                let result = guard.check(ctx);
                tracing::debug!(
                    guard = guard.name(),
                    checks = guard.description(),
                    passed = result.is_pass(),
                    diagnostic = %result.diagnostic,
                    "registry guard evaluated"
                );
                result
            })
            .collect();
        GuardResults { results }
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }
}

// =============================================================================
// Guard Results Collection
// =============================================================================

#[derive(Debug, Clone)]
pub struct GuardResults {
    pub results: Vec<GuardResult>,
}

impl GuardResults {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(GuardResult::is_pass)
    }

    pub fn failures(&self) -> Vec<&GuardResult> {
        self.results.iter().filter(|r| r.is_fail()).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().len()
    }

    /// Every violation, in guard order.
    pub fn violations(&self) -> impl Iterator<Item = &RegistryError> {
        self.results.iter().flat_map(|r| r.violations.iter())
    }

    pub fn remediation_summary(&self) -> String {
        let failures = self.failures();
        if failures.is_empty() {
            return "All guards passed.".to_string();
        }

        let mut summary = format!("{} guard(s) failed:\n", failures.len());
        for (i, failure) in failures.iter().enumerate() {
            summary.push_str(&format!(
                "{}. {} - {}\n   Remediation: {}\n",
                i + 1,
                failure.guard_name,
                failure.diagnostic,
                failure.remediation
            ));
        }
        summary
    }

    /// The first violation as an error, or `Ok` if every guard passed.
    pub fn into_result(self) -> Result<(), RegistryError> {
        match self.results.into_iter().flat_map(|r| r.violations).next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_result_pass() {
        let result = GuardResult::pass("TestGuard", "ok");
        assert!(result.is_pass());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_guard_result_fail_joins_violations() {
        let result = GuardResult::fail(
            "TestGuard",
            vec![
                RegistryError::EmptyLanguage {
                    language: "a".to_string(),
                },
                RegistryError::EmptyLanguage {
                    language: "b".to_string(),
                },
            ],
            "Fix it",
        );
        assert!(result.is_fail());
        assert_eq!(
            result.diagnostic,
            "language `a` declares no rules; language `b` declares no rules"
        );
    }

    #[test]
    fn test_guard_results_into_result_returns_first_violation() {
        let results = GuardResults {
            results: vec![
                GuardResult::pass("G1", "ok"),
                GuardResult::fail(
                    "G2",
                    vec![RegistryError::UnknownLanguage {
                        language: "x".to_string(),
                    }],
                    "fix",
                ),
                GuardResult::fail(
                    "G3",
                    vec![RegistryError::EmptyLanguage {
                        language: "y".to_string(),
                    }],
                    "fix",
                ),
            ],
        };
        assert!(!results.all_passed());
        assert_eq!(results.failure_count(), 2);
        assert!(results.remediation_summary().starts_with("2 guard(s) failed"));
        assert_eq!(
            results.into_result(),
            Err(RegistryError::UnknownLanguage {
                language: "x".to_string()
            })
        );
    }

    #[test]
    fn test_guard_kernel_default_suite() {
        assert_eq!(GuardKernel::default_suite().guard_count(), 5);
    }
}
