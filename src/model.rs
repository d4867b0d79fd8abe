//! Registry data model: languages, the rules they own, and the small value
//! types (flags, attrs, plugins, platforms) a rule is described with.
//!
//! Everything here is plain immutable data. Values are built once with the
//! chaining setters below and then handed to [`crate::registry::Registry`],
//! which validates them and never mutates them afterwards.

use crate::error::RegistryError;
use crate::template::TemplateId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

// =============================================================================
// Value Types
// =============================================================================

/// A Bazel command-line flag a rule or language needs (or recommends).
///
/// Identity is `(category, name)`; the same flag may appear more than once in
/// an effective flag list, in which case consumers apply the last value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flag {
    /// Bazel command the flag applies to (`build`, `test`, ...)
    pub category: String,
    pub name: String,
    pub value: String,
    pub description: String,
}

impl Flag {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            value: value.into(),
            description: description.into(),
        }
    }
}

/// One parameter exposed by a generated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub name: String,
    /// Starlark type as shown in documentation, e.g. `list<ProtoInfo>`
    #[serde(rename = "type")]
    pub ty: String,
    pub default: String,
    pub doc: String,
    pub mandatory: bool,
}

impl Attr {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: String::new(),
            doc: String::new(),
            mandatory: false,
        }
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// A protoc plugin the rule's compile step invokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// Bazel label of the plugin target
    pub tool: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Plugin {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

impl From<&str> for Plugin {
    fn from(tool: &str) -> Self {
        Plugin::new(tool)
    }
}

/// Whether a rule compiles messages only or messages plus gRPC services.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Proto,
    Grpc,
}

/// CI platforms example workspaces are tested on, in canonical order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Ubuntu1804,
    Macos,
    Windows,
}

// =============================================================================
// Skip Policy
// =============================================================================

const SKIP_ALL: &str = "all";
const SKIP_NONE: &str = "none";

/// Which platforms a language or rule is *not* tested on.
///
/// A rule-level policy other than `Inherit` replaces the language-level one
/// wholesale; the two are never merged. Serialized as the legacy token list
/// (`[]`, `["all"]`, `["none"]`, `["windows", ...]`).
///
/// `Platforms([])` and `None` mean the same thing and both serialize as
/// `["none"]`, which parses back as `None`. [`SkipPolicy::platforms`] and
/// [`SkipPolicy::from_tokens`] only ever produce the `None` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum SkipPolicy {
    /// Use the enclosing level's policy
    #[default]
    Inherit,
    /// Skip exactly these platforms
    Platforms(Vec<Platform>),
    /// Skip every platform
    All,
    /// Skip nothing, whatever the enclosing level says
    None,
}

impl SkipPolicy {
    /// Skip `platforms`; an empty list is [`SkipPolicy::None`].
    pub fn platforms<I: IntoIterator<Item = Platform>>(platforms: I) -> Self {
        let platforms: Vec<_> = platforms.into_iter().collect();
        if platforms.is_empty() {
            SkipPolicy::None
        } else {
            SkipPolicy::Platforms(platforms)
        }
    }

    /// Parse a legacy token list. `all` and `none` must stand alone.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .collect();

        let sentinel = tokens
            .iter()
            .find(|t| t.as_str() == SKIP_ALL || t.as_str() == SKIP_NONE);
        if let Some(sentinel) = sentinel {
            if tokens.len() > 1 {
                return Err(RegistryError::InvalidSkipPolicy {
                    tokens: tokens.clone(),
                    reason: format!("`{sentinel}` cannot be combined with other entries"),
                });
            }
            return Ok(if sentinel == SKIP_ALL {
                SkipPolicy::All
            } else {
                SkipPolicy::None
            });
        }

        if tokens.is_empty() {
            return Ok(SkipPolicy::Inherit);
        }

        let platforms = tokens
            .iter()
            .map(|t| {
                t.parse::<Platform>()
                    .map_err(|_| RegistryError::InvalidSkipPolicy {
                        tokens: tokens.clone(),
                        reason: format!("unknown platform `{t}`"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SkipPolicy::Platforms(platforms))
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, SkipPolicy::Inherit)
    }

    /// `self` unless it inherits, in which case `parent`.
    pub fn or<'a>(&'a self, parent: &'a SkipPolicy) -> &'a SkipPolicy {
        if self.is_inherit() { parent } else { self }
    }

    /// Concrete platforms skipped under this policy.
    pub fn skipped(&self) -> Vec<Platform> {
        match self {
            SkipPolicy::Inherit | SkipPolicy::None => Vec::new(),
            SkipPolicy::All => Platform::iter().collect(),
            SkipPolicy::Platforms(platforms) => platforms.clone(),
        }
    }
}

impl TryFrom<Vec<String>> for SkipPolicy {
    type Error = RegistryError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        SkipPolicy::from_tokens(tokens)
    }
}

impl From<SkipPolicy> for Vec<String> {
    fn from(policy: SkipPolicy) -> Self {
        match policy {
            SkipPolicy::Inherit => Vec::new(),
            SkipPolicy::All => vec![SKIP_ALL.to_string()],
            SkipPolicy::None => vec![SKIP_NONE.to_string()],
            SkipPolicy::Platforms(platforms) if platforms.is_empty() => {
                vec![SKIP_NONE.to_string()]
            }
            SkipPolicy::Platforms(platforms) => {
                platforms.iter().map(|p| p.to_string()).collect()
            }
        }
    }
}

// =============================================================================
// Rule Descriptor
// =============================================================================

/// A named, generatable build rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Globally unique rule name, e.g. `python_grpc_compile`
    pub name: String,
    /// Base name; the owning language's name when unset
    pub base: Option<String>,
    pub kind: RuleKind,
    /// One-line description shown in documentation
    pub doc: String,
    /// Template for `<rule>.bzl`; mandatory, checked at registry construction
    pub implementation: Option<TemplateId>,
    pub workspace_example: Option<TemplateId>,
    pub build_example: Option<TemplateId>,
    pub documentation: Option<TemplateId>,
    pub attrs: Vec<Attr>,
    pub plugins: Vec<Plugin>,
    /// Not expected to be functional; excluded from the CI matrix
    pub experimental: bool,
    pub flags: Vec<Flag>,
    /// CI environment variables, overlaid on the language's
    pub presubmit_env_vars: IndexMap<String, String>,
    pub skip_test_platforms: SkipPolicy,
}

impl Rule {
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn implementation(mut self, template: TemplateId) -> Self {
        self.implementation = Some(template);
        self
    }

    pub fn workspace_example(mut self, template: TemplateId) -> Self {
        self.workspace_example = Some(template);
        self
    }

    pub fn build_example(mut self, template: TemplateId) -> Self {
        self.build_example = Some(template);
        self
    }

    pub fn documentation(mut self, template: TemplateId) -> Self {
        self.documentation = Some(template);
        self
    }

    pub fn attrs<I: IntoIterator<Item = Attr>>(mut self, attrs: I) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn plugins<I, P>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Plugin>,
    {
        self.plugins.extend(plugins.into_iter().map(Into::into));
        self
    }

    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    pub fn flags<I: IntoIterator<Item = Flag>>(mut self, flags: I) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.presubmit_env_vars.insert(key.into(), value.into());
        self
    }

    pub fn skip_test_platforms(mut self, policy: SkipPolicy) -> Self {
        self.skip_test_platforms = policy;
        self
    }

    /// Every template this rule references, paired with the field naming it.
    pub fn template_refs(&self) -> Vec<(&'static str, &TemplateId)> {
        [
            ("implementation", self.implementation.as_ref()),
            ("workspace_example", self.workspace_example.as_ref()),
            ("build_example", self.build_example.as_ref()),
            ("documentation", self.documentation.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, id)| id.map(|id| (field, id)))
        .collect()
    }
}

// =============================================================================
// Language Descriptor
// =============================================================================

/// A directory of rules sharing a namespace and default configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Language {
    /// Directory in the rules repository, usually the same as `name`
    pub dir: String,
    pub name: String,
    pub display_name: String,
    pub rules: Vec<Rule>,
    /// Markdown notes rendered at the top of the language README
    pub notes: Option<TemplateId>,
    pub flags: Vec<Flag>,
    pub presubmit_env_vars: IndexMap<String, String>,
    /// Generated compile rules pass `merge_directories = False` when set
    pub skip_directories_merge: bool,
    pub skip_test_platforms: SkipPolicy,
}

impl Language {
    pub fn new(
        dir: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules<I: IntoIterator<Item = Rule>>(mut self, rules: I) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn notes(mut self, template: TemplateId) -> Self {
        self.notes = Some(template);
        self
    }

    pub fn flags<I: IntoIterator<Item = Flag>>(mut self, flags: I) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.presubmit_env_vars.insert(key.into(), value.into());
        self
    }

    pub fn skip_directories_merge(mut self) -> Self {
        self.skip_directories_merge = true;
        self
    }

    pub fn skip_test_platforms(mut self, policy: SkipPolicy) -> Self {
        self.skip_test_platforms = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_skip_policy_parses_sentinels() {
        assert_eq!(SkipPolicy::from_tokens(["all"]).unwrap(), SkipPolicy::All);
        assert_eq!(SkipPolicy::from_tokens(["none"]).unwrap(), SkipPolicy::None);
        assert_eq!(
            SkipPolicy::from_tokens(Vec::<String>::new()).unwrap(),
            SkipPolicy::Inherit
        );
        assert_eq!(
            SkipPolicy::from_tokens(["windows", "macos"]).unwrap(),
            SkipPolicy::platforms([Platform::Windows, Platform::Macos])
        );
    }

    #[test]
    fn test_skip_policy_rejects_mixed_sentinel() {
        let err = SkipPolicy::from_tokens(["all", "windows"]).unwrap_err();
        assert_matches!(err, RegistryError::InvalidSkipPolicy { .. });
    }

    #[test]
    fn test_skip_policy_rejects_unknown_platform() {
        let err = SkipPolicy::from_tokens(["plan9"]).unwrap_err();
        assert!(err.to_string().contains("plan9"));
    }

    #[test]
    fn test_skip_policy_all_expands_to_every_platform() {
        assert_eq!(
            SkipPolicy::All.skipped(),
            vec![Platform::Ubuntu1804, Platform::Macos, Platform::Windows]
        );
        assert!(SkipPolicy::None.skipped().is_empty());
    }

    #[test]
    fn test_skip_policy_token_form_is_stable() {
        let tokens: Vec<String> = SkipPolicy::Platforms(Vec::new()).into();
        assert_eq!(tokens, vec!["none".to_string()]);

        let json = serde_json::to_string(&SkipPolicy::platforms([Platform::Windows])).unwrap();
        assert_eq!(json, r#"["windows"]"#);
        let back: SkipPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SkipPolicy::platforms([Platform::Windows]));
    }

    #[test]
    fn test_empty_platform_list_is_canonical_none() {
        assert_eq!(SkipPolicy::platforms([]), SkipPolicy::None);

        let json = serde_json::to_string(&SkipPolicy::platforms([])).unwrap();
        let back: SkipPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SkipPolicy::platforms([]));
    }

    #[test]
    fn test_rule_template_refs_lists_only_set_templates() {
        let rule = Rule::new("go_proto_compile", RuleKind::Proto)
            .implementation(TemplateId::new("impl"))
            .documentation(TemplateId::new("doc"));
        let fields: Vec<_> = rule.template_refs().into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["implementation", "documentation"]);
    }
}
