//! Property-Based Invariant Testing
//!
//! Invariants that must hold for arbitrary registries:
//! - Effective flags are always language flags followed by rule flags
//! - A non-inheriting rule skip policy fully replaces the language's
//! - Rule env vars win, language env vars fill the gaps
//! - Resolution and generation are deterministic

use proptest::prelude::*;
use proto_rulegen::{
    Flag, Language, Platform, Registry, Rule, RuleKind, SkipPolicy, TemplateId, TemplateSet,
    generate, resolve,
};
use std::collections::BTreeMap;

// =============================================================================
// Strategies
// =============================================================================

fn platform() -> impl Strategy<Value = Platform> {
    prop_oneof![
        Just(Platform::Ubuntu1804),
        Just(Platform::Macos),
        Just(Platform::Windows),
    ]
}

fn skip_policy() -> impl Strategy<Value = SkipPolicy> {
    prop_oneof![
        Just(SkipPolicy::Inherit),
        Just(SkipPolicy::All),
        Just(SkipPolicy::None),
        prop::collection::vec(platform(), 0..3).prop_map(SkipPolicy::Platforms),
    ]
}

fn flags() -> impl Strategy<Value = Vec<Flag>> {
    prop::collection::vec(
        ("(build|test)", "[a-z_]{1,8}", "[A-Za-z0-9=]{0,8}")
            .prop_map(|(category, name, value)| Flag::new(category, name, value, "")),
        0..5,
    )
}

fn env_vars() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[A-C]{1,2}", "[a-z]{0,4}", 0..4)
}

fn language(
    flags: Vec<Flag>,
    env: &BTreeMap<String, String>,
    policy: SkipPolicy,
) -> Language {
    env.iter().fold(
        Language::new("lang", "lang", "Lang")
            .flags(flags)
            .skip_test_platforms(policy),
        |language, (k, v)| language.env_var(k, v),
    )
}

fn rule(flags: Vec<Flag>, env: &BTreeMap<String, String>, policy: SkipPolicy) -> Rule {
    env.iter().fold(
        Rule::new("lang_grpc_compile", RuleKind::Grpc)
            .plugins(["//lang:plugin"])
            .implementation(TemplateId::new("impl"))
            .flags(flags)
            .skip_test_platforms(policy),
        |rule, (k, v)| rule.env_var(k, v),
    )
}

// =============================================================================
// Resolver Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Invariant: flags are L ++ R, never reordered or de-duplicated
    #[test]
    fn invariant_flags_concatenate_in_order(lang_flags in flags(), rule_flags in flags()) {
        let l = language(lang_flags.clone(), &BTreeMap::new(), SkipPolicy::Inherit);
        let r = rule(rule_flags.clone(), &BTreeMap::new(), SkipPolicy::Inherit);

        let mut expected = lang_flags;
        expected.extend(rule_flags);
        prop_assert_eq!(resolve(&l, &r).flags, expected);
    }

    /// Invariant: the rule policy wins unless it inherits
    #[test]
    fn invariant_skip_policy_override(lang_policy in skip_policy(), rule_policy in skip_policy()) {
        let l = language(Vec::new(), &BTreeMap::new(), lang_policy.clone());
        let r = rule(Vec::new(), &BTreeMap::new(), rule_policy.clone());

        let expected = if rule_policy.is_inherit() { lang_policy } else { rule_policy };
        prop_assert_eq!(resolve(&l, &r).skip_test_platforms, expected.skipped());
    }

    /// Invariant: an explicit `None` rule policy tests everywhere
    #[test]
    fn invariant_none_tests_every_platform(lang_policy in skip_policy(), p in platform()) {
        let l = language(Vec::new(), &BTreeMap::new(), lang_policy);
        let r = rule(Vec::new(), &BTreeMap::new(), SkipPolicy::None);
        prop_assert!(resolve(&l, &r).tests_on(p));
    }

    /// Invariant: env vars are the key union, rule values winning
    #[test]
    fn invariant_env_vars_overlay(lang_env in env_vars(), rule_env in env_vars()) {
        let l = language(Vec::new(), &lang_env, SkipPolicy::Inherit);
        let r = rule(Vec::new(), &rule_env, SkipPolicy::Inherit);
        let effective = resolve(&l, &r).presubmit_env_vars;

        for (key, value) in &effective {
            match rule_env.get(key) {
                Some(rule_value) => prop_assert_eq!(value, rule_value),
                None => prop_assert_eq!(Some(value), lang_env.get(key)),
            }
        }
        prop_assert!(lang_env.keys().chain(rule_env.keys()).all(|k| effective.contains_key(k)));
    }

    /// Invariant: resolving twice gives identical results
    #[test]
    fn invariant_resolution_is_pure(
        lang_flags in flags(),
        rule_flags in flags(),
        lang_env in env_vars(),
        rule_env in env_vars(),
        lang_policy in skip_policy(),
        rule_policy in skip_policy(),
    ) {
        let l = language(lang_flags, &lang_env, lang_policy);
        let r = rule(rule_flags, &rule_env, rule_policy);
        prop_assert_eq!(resolve(&l, &r), resolve(&l, &r));
    }
}

// =============================================================================
// Generation Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant: the catalog digest depends only on the registry
    #[test]
    fn invariant_generation_is_deterministic(
        lang_flags in flags(),
        rule_env in env_vars(),
        policy in skip_policy(),
    ) {
        let templates = TemplateSet::builder()
            .template(
                "impl",
                "{{ rule.name }}\n{% for f in rule.flags %}{{ f.category }} --{{ f.name }}={{ f.value }}\n{% endfor %}\
                 {% for k, v in rule.presubmit_env_vars %}{{ k }}={{ v }}\n{% endfor %}\
                 {% for p in rule.skip_test_platforms %}{{ p }}\n{% endfor %}",
            )
            .build()
            .unwrap();
        let l = language(lang_flags, &BTreeMap::new(), policy)
            .rule(rule(Vec::new(), &rule_env, SkipPolicy::Inherit));
        let registry = Registry::new(vec![l], templates).unwrap();

        let first = generate(&registry).unwrap();
        let second = generate(&registry).unwrap();
        prop_assert_eq!(first.digest(), second.digest());
        prop_assert_eq!(first, second);
    }
}
