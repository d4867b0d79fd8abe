//! Serializable views handed to templates.
//!
//! The field names here are the template-facing API: `lang.dir`,
//! `rule.kind`, `rule.plugins`, and so on. Rule views carry the *effective*
//! flags, env vars and skip list, not the rule's raw declarations.

use crate::model::{Attr, Flag, Language, Platform, Plugin, Rule, RuleKind};
use crate::resolver::EffectiveConfig;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct LangView<'a> {
    pub dir: &'a str,
    pub name: &'a str,
    pub display_name: &'a str,
    pub skip_directories_merge: bool,
    pub flags: &'a [Flag],
    pub presubmit_env_vars: &'a IndexMap<String, String>,
}

impl<'a> From<&'a Language> for LangView<'a> {
    fn from(language: &'a Language) -> Self {
        Self {
            dir: &language.dir,
            name: &language.name,
            display_name: &language.display_name,
            skip_directories_merge: language.skip_directories_merge,
            flags: &language.flags,
            presubmit_env_vars: &language.presubmit_env_vars,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleView<'a> {
    pub name: &'a str,
    pub base: &'a str,
    pub kind: RuleKind,
    pub doc: &'a str,
    pub experimental: bool,
    pub attrs: &'a [Attr],
    pub plugins: &'a [Plugin],
    pub flags: &'a [Flag],
    pub presubmit_env_vars: &'a BTreeMap<String, String>,
    pub skip_test_platforms: &'a [Platform],
}

/// Context for every per-rule artifact.
#[derive(Debug, Clone, Serialize)]
pub struct RuleContext<'a> {
    pub lang: LangView<'a>,
    pub rule: RuleView<'a>,
}

impl<'a> RuleContext<'a> {
    pub fn new(language: &'a Language, rule: &'a Rule, effective: &'a EffectiveConfig) -> Self {
        Self {
            lang: LangView::from(language),
            rule: RuleView {
                name: &rule.name,
                base: rule.base.as_deref().unwrap_or(&language.name),
                kind: rule.kind,
                doc: &rule.doc,
                experimental: rule.experimental,
                attrs: &effective.attrs,
                plugins: &rule.plugins,
                flags: &effective.flags,
                presubmit_env_vars: &effective.presubmit_env_vars,
                skip_test_platforms: &effective.skip_test_platforms,
            },
        }
    }
}

/// Rule context plus the already-rendered usage examples, for documentation.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentationContext<'a> {
    #[serde(flatten)]
    pub base: &'a RuleContext<'a>,
    pub workspace_example: Option<&'a str>,
    pub build_example: Option<&'a str>,
}

/// Context for language-level templates such as notes.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageContext<'a> {
    pub lang: LangView<'a>,
}

impl<'a> From<&'a Language> for LanguageContext<'a> {
    fn from(language: &'a Language) -> Self {
        Self {
            lang: LangView::from(language),
        }
    }
}
