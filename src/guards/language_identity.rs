//! G1: Language Identity Guard
//!
//! Language `name` and `dir` namespace every artifact, so both must be
//! unique, and `dir` must stay inside the output tree.

use crate::error::RegistryError;
use crate::guards::{Guard, GuardContext, GuardResult};
use std::collections::HashSet;
use std::path::{Component, Path};

pub struct LanguageIdentityGuard;

impl LanguageIdentityGuard {
    fn dir_problem(dir: &str) -> Option<&'static str> {
        if dir.trim().is_empty() {
            return Some("directory is empty");
        }
        let path = Path::new(dir);
        if path.is_absolute() || dir.starts_with('/') || dir.starts_with('\\') {
            return Some("directory must be relative");
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Some("directory must not contain `..`");
        }
        None
    }
}

impl Guard for LanguageIdentityGuard {
    fn name(&self) -> &str {
        "G1: Language Identity"
    }

    fn description(&self) -> &str {
        "Checks language names and directories are unique and safe"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        let mut violations = Vec::new();
        let mut names = HashSet::new();
        let mut dirs = HashSet::new();

        for language in ctx.languages {
            if !names.insert(language.name.as_str()) {
                violations.push(RegistryError::DuplicateLanguage {
                    field: "name",
                    value: language.name.clone(),
                });
            }
            if !dirs.insert(language.dir.as_str()) {
                violations.push(RegistryError::DuplicateLanguage {
                    field: "dir",
                    value: language.dir.clone(),
                });
            }
            if let Some(reason) = Self::dir_problem(&language.dir) {
                violations.push(RegistryError::InvalidLanguageDir {
                    language: language.name.clone(),
                    dir: language.dir.clone(),
                    reason: reason.to_string(),
                });
            }
            if language.rules.is_empty() {
                violations.push(RegistryError::EmptyLanguage {
                    language: language.name.clone(),
                });
            }
        }

        GuardResult::from_violations(
            self.name(),
            violations,
            format!("{} language(s) with distinct identities", ctx.languages.len()),
            "Give every language a unique name and a unique relative dir, and at least one rule",
        )
    }
}
