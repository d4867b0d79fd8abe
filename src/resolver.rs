//! Override resolution: the effective configuration of one (language, rule)
//! pair.
//!
//! Each field is resolved on its own:
//!
//! | field | effective value |
//! | --- | --- |
//! | `skip_test_platforms` | the rule's policy unless it inherits, else the language's |
//! | `flags` | language flags followed by rule flags, duplicates kept |
//! | `presubmit_env_vars` | language entries overlaid by rule entries |
//! | `attrs` | the rule's own, never inherited |
//!
//! [`resolve`] is a pure function of its two arguments.

use crate::model::{Attr, Flag, Language, Platform, Rule};
use serde::Serialize;
use std::collections::BTreeMap;

/// Resolved configuration for one rule in the context of its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub attrs: Vec<Attr>,
    /// In order; consumers wanting one value per flag apply last-wins
    pub flags: Vec<Flag>,
    /// Keyed and iterated in sorted order
    pub presubmit_env_vars: BTreeMap<String, String>,
    /// Platforms the rule's example is not tested on
    pub skip_test_platforms: Vec<Platform>,
}

impl EffectiveConfig {
    pub fn tests_on(&self, platform: Platform) -> bool {
        !self.skip_test_platforms.contains(&platform)
    }
}

pub fn resolve(language: &Language, rule: &Rule) -> EffectiveConfig {
    let flags = language
        .flags
        .iter()
        .chain(rule.flags.iter())
        .cloned()
        .collect();

    let mut presubmit_env_vars: BTreeMap<String, String> = language
        .presubmit_env_vars
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in &rule.presubmit_env_vars {
        presubmit_env_vars.insert(key.clone(), value.clone());
    }

    let skip_test_platforms = rule
        .skip_test_platforms
        .or(&language.skip_test_platforms)
        .skipped();

    EffectiveConfig {
        attrs: rule.attrs.clone(),
        flags,
        presubmit_env_vars,
        skip_test_platforms,
    }
}
