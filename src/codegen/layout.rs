//! Maps a catalog onto a rules repository tree.
//!
//! | path | content |
//! | --- | --- |
//! | `<dir>/<rule>.bzl` | implementation |
//! | `<dir>/defs.bzl` | load-and-reexport index of every rule |
//! | `<dir>/README.md` | notes, rule table, every rule's documentation |
//! | `example/<dir>/<rule>/WORKSPACE` | workspace example |
//! | `example/<dir>/<rule>/BUILD.bazel` | build example |
//! | `example/<dir>/<rule>/.bazelrc` | effective flags, when there are any |
//! | `.bazelci/presubmit.yml` | CI matrix |
//!
//! The templates for the index, README, `.bazelrc` and CI matrix belong to the
//! layout, not to the registry.

use crate::catalog::{ArtifactCatalog, ArtifactKind};
use crate::error::{GenerationError, RenderSite, TemplateDefinitionError};
use crate::logging::{language_span, operation_span};
use crate::model::{Flag, Language, Platform, Rule};
use crate::registry::Registry;
use crate::resolver::resolve;
use crate::template::{LangView, LanguageContext, Renderer, TemplateId, TemplateSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub const PRESUBMIT_PATH: &str = ".bazelci/presubmit.yml";
const EXAMPLE_ROOT: &str = "example";

const DEFS: TemplateId = TemplateId::from_static("layout/defs.bzl");
const README: TemplateId = TemplateId::from_static("layout/README.md");
const BAZELRC: TemplateId = TemplateId::from_static("layout/.bazelrc");
const PRESUBMIT: TemplateId = TemplateId::from_static("layout/presubmit.yml");

const DEFS_SRC: &str = r#""""Public definitions for {{ lang.display_name }} rules"""

{% for rule in rules %}load("//{{ lang.dir }}:{{ rule.name }}.bzl", _{{ rule.name }} = "{{ rule.name }}")
{% endfor %}
# Export {{ lang.name }} rules
{% for rule in rules %}{{ rule.name }} = _{{ rule.name }}
{% endfor %}"#;

const README_SRC: &str = r#"# {{ lang.display_name }} rules
{% if notes %}
{{ notes }}
{% endif %}
| Rule | Description |
| ---: | :--- |
{% for rule in rules %}| [{{ rule.name }}](#{{ rule.name }}) | {{ rule.doc }}{% if rule.experimental %} (experimental){% endif %} |
{% endfor %}{% for doc in docs %}
{{ doc }}{% endfor %}
"#;

const BAZELRC_SRC: &str = r#"{% for flag in flags %}{{ flag.category }} --{{ flag.name }}={{ flag.value }}
{% endfor %}"#;

const PRESUBMIT_SRC: &str = r#"---
tasks:
{%- for platform in platforms %}
  {{ platform.name }}:
    name: {{ platform.name | json_encode() }}
    platform: {{ platform.name }}
    build_targets:
{%- for target in platform.build_targets %}
      - {{ target | json_encode() }}
{%- endfor %}
{%- for example in platform.examples %}
  {{ example.task }}:
    name: {{ example.rule | json_encode() }}
    platform: {{ platform.name }}
    working_directory: {{ example.working_directory | json_encode() }}
{%- if example.environment %}
    environment:
{%- for key, value in example.environment %}
      {{ key }}: {{ value | json_encode() }}
{%- endfor %}
{%- endif %}
{%- if example.build_flags %}
    build_flags:
{%- for flag in example.build_flags %}
      - {{ flag | json_encode() }}
{%- endfor %}
{%- endif %}
    build_targets:
      - "//..."
{%- endfor %}
{%- endfor %}
"#;

// =============================================================================
// Output Tree
// =============================================================================

/// Generated files keyed by path relative to the output root, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    files: BTreeMap<PathBuf, String>,
}

impl OutputTree {
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn implementation_path(language: &Language, rule: &Rule) -> PathBuf {
    Path::new(&language.dir).join(format!("{}.bzl", rule.name))
}

pub fn example_dir(language: &Language, rule: &Rule) -> PathBuf {
    Path::new(EXAMPLE_ROOT).join(&language.dir).join(&rule.name)
}

// =============================================================================
// Template Contexts
// =============================================================================

#[derive(Debug, Serialize)]
struct RuleSummary<'a> {
    name: &'a str,
    doc: &'a str,
    experimental: bool,
}

impl<'a> From<&'a Rule> for RuleSummary<'a> {
    fn from(rule: &'a Rule) -> Self {
        Self {
            name: &rule.name,
            doc: &rule.doc,
            experimental: rule.experimental,
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexContext<'a> {
    lang: LangView<'a>,
    rules: Vec<RuleSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct ReadmeContext<'a> {
    lang: LangView<'a>,
    notes: Option<String>,
    rules: Vec<RuleSummary<'a>>,
    docs: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct BazelrcContext<'a> {
    flags: &'a [Flag],
}

#[derive(Debug, Serialize)]
struct PresubmitContext {
    platforms: Vec<PlatformTasks>,
}

#[derive(Debug, Serialize)]
struct PlatformTasks {
    name: Platform,
    build_targets: Vec<String>,
    examples: Vec<ExampleTask>,
}

#[derive(Debug, Serialize)]
struct ExampleTask {
    task: String,
    rule: String,
    working_directory: String,
    environment: BTreeMap<String, String>,
    build_flags: Vec<String>,
}

// =============================================================================
// Layout
// =============================================================================

/// Turns a registry and its catalog into an [`OutputTree`].
#[derive(Debug, Clone)]
pub struct Layout {
    templates: TemplateSet,
}

impl Layout {
    pub fn new() -> Result<Self, TemplateDefinitionError> {
        let templates = TemplateSet::builder()
            .template(DEFS, DEFS_SRC)
            .template(README, README_SRC)
            .template(BAZELRC, BAZELRC_SRC)
            .template(PRESUBMIT, PRESUBMIT_SRC)
            .build()?;
        Ok(Self { templates })
    }

    pub fn assemble(
        &self,
        registry: &Registry,
        catalog: &ArtifactCatalog,
    ) -> Result<OutputTree, GenerationError> {
        let _span = operation_span("assemble_layout").entered();
        let renderer = Renderer::new(&self.templates);
        let mut tree = OutputTree::default();

        for language in registry.languages() {
            let _span = language_span(&language.name).entered();
            self.language_files(&renderer, registry, catalog, language, &mut tree)?;
        }

        let presubmit = presubmit_context(registry);
        let text = renderer.render(&PRESUBMIT, &presubmit, RenderSite::registry(PRESUBMIT_PATH))?;
        check_yaml(PRESUBMIT_PATH, &text)?;
        tree.insert(PRESUBMIT_PATH, text);

        tracing::info!(files = tree.len(), "output tree assembled");
        Ok(tree)
    }

    fn language_files(
        &self,
        renderer: &Renderer<'_>,
        registry: &Registry,
        catalog: &ArtifactCatalog,
        language: &Language,
        tree: &mut OutputTree,
    ) -> Result<(), GenerationError> {
        let lang_dir = Path::new(&language.dir);

        for rule in &language.rules {
            if let Some(text) = catalog.get(&language.name, &rule.name, ArtifactKind::Implementation) {
                tree.insert(implementation_path(language, rule), text);
            }

            let example = example_dir(language, rule);
            if let Some(text) = catalog.get(&language.name, &rule.name, ArtifactKind::WorkspaceExample) {
                tree.insert(example.join("WORKSPACE"), text);
            }
            if let Some(text) = catalog.get(&language.name, &rule.name, ArtifactKind::BuildExample) {
                tree.insert(example.join("BUILD.bazel"), text);
            }

            let effective = resolve(language, rule);
            if !effective.flags.is_empty() {
                let site = RenderSite::rule(&language.name, &rule.name, ".bazelrc");
                let text = renderer.render(
                    &BAZELRC,
                    &BazelrcContext {
                        flags: &effective.flags,
                    },
                    site,
                )?;
                tree.insert(example.join(".bazelrc"), text);
            }
        }

        let summaries = || language.rules.iter().map(RuleSummary::from).collect::<Vec<_>>();

        let index = IndexContext {
            lang: LangView::from(language),
            rules: summaries(),
        };
        let text = renderer.render(&DEFS, &index, RenderSite::language(&language.name, "defs.bzl"))?;
        tree.insert(lang_dir.join("defs.bzl"), text);

        // Notes live in the registry's template set, not the layout's.
        let notes = language
            .notes
            .as_ref()
            .map(|notes| {
                Renderer::new(registry.templates()).render(
                    notes,
                    &LanguageContext::from(language),
                    RenderSite::language(&language.name, "notes"),
                )
            })
            .transpose()?;

        let readme = ReadmeContext {
            lang: LangView::from(language),
            notes,
            rules: summaries(),
            docs: catalog
                .of_kind(&language.name, ArtifactKind::Documentation)
                .map(|(_, text)| text)
                .collect(),
        };
        let text = renderer.render(&README, &readme, RenderSite::language(&language.name, "README.md"))?;
        tree.insert(lang_dir.join("README.md"), text);

        Ok(())
    }
}

fn presubmit_context(registry: &Registry) -> PresubmitContext {
    let build_targets: Vec<String> = registry
        .languages()
        .iter()
        .map(|l| format!("//{}/...", l.dir))
        .collect();

    let platforms = Platform::iter()
        .map(|platform| {
            let examples = registry
                .rules()
                .filter(|(_, rule)| !rule.experimental)
                .filter_map(|(language, rule)| {
                    let effective = resolve(language, rule);
                    if !effective.tests_on(platform) {
                        return None;
                    }
                    let build_flags = effective
                        .flags
                        .iter()
                        .filter(|f| f.category == "build")
                        .map(|f| format!("--{}={}", f.name, f.value))
                        .collect();
                    Some(ExampleTask {
                        task: format!("{}_{}", rule.name, platform),
                        rule: rule.name.clone(),
                        working_directory: example_dir(language, rule)
                            .to_string_lossy()
                            .replace('\\', "/"),
                        environment: effective.presubmit_env_vars,
                        build_flags,
                    })
                })
                .collect();
            PlatformTasks {
                name: platform,
                build_targets: build_targets.clone(),
                examples,
            }
        })
        .collect();

    PresubmitContext { platforms }
}

/// Parse rendered YAML back; it must be a mapping with a `tasks` mapping.
fn check_yaml(path: &str, text: &str) -> Result<(), GenerationError> {
    let malformed = |message: String| GenerationError::MalformedOutput {
        path: path.to_string(),
        message,
    };
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| malformed(e.to_string()))?;
    value
        .get("tasks")
        .and_then(serde_yaml::Value::as_mapping)
        .ok_or_else(|| malformed("missing `tasks` mapping".to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::generate;
    use crate::languages::builtin_registry;
    use assert_matches::assert_matches;

    fn tree() -> OutputTree {
        let registry = builtin_registry().unwrap();
        let catalog = generate(&registry).unwrap();
        Layout::new().unwrap().assemble(&registry, &catalog).unwrap()
    }

    #[test]
    fn test_implementation_lands_in_language_dir() {
        let tree = tree();
        assert!(tree.get("python/python_grpc_compile.bzl").is_some());
        assert!(tree.get("csharp/csharp_proto_library.bzl").is_some());
    }

    #[test]
    fn test_defs_reexports_every_rule() {
        let tree = tree();
        let defs = tree.get("python/defs.bzl").unwrap();
        assert!(defs.contains(
            r#"load("//python:python_grpclib_library.bzl", _python_grpclib_library = "python_grpclib_library")"#
        ));
        assert!(defs.contains("python_proto_compile = _python_proto_compile\n"));
    }

    #[test]
    fn test_readme_orders_documentation_like_rules() {
        let tree = tree();
        let readme = tree.get("csharp/README.md").unwrap();
        assert!(readme.starts_with("# C# rules\n"));
        assert!(readme.contains("sandboxing"));
        let compile = readme.find("## `csharp_proto_compile`").unwrap();
        let library = readme.find("## `csharp_grpc_library`").unwrap();
        assert!(compile < library);
        assert!(readme.contains("| [csharp_grpc_library](#csharp_grpc_library) |"));
    }

    #[test]
    fn test_bazelrc_only_for_rules_with_flags() {
        let tree = tree();
        assert_eq!(
            tree.get("example/csharp/csharp_grpc_library/.bazelrc"),
            Some("build --strategy=CoreCompile=standalone\n")
        );
        assert!(tree.get("example/python/python_grpc_library/.bazelrc").is_none());
    }

    #[test]
    fn test_presubmit_honors_skip_policies() {
        let tree = tree();
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(tree.get(PRESUBMIT_PATH).unwrap()).unwrap();
        let tasks = yaml["tasks"].as_mapping().unwrap();
        let has = |key: &str| tasks.contains_key(serde_yaml::Value::from(key));

        assert!(has("ubuntu1804"));
        assert!(has("python_grpc_library_macos"));
        assert!(!has("python_grpc_library_windows"));
        // csharp skips everything, except where a compile rule opts back in
        assert!(has("csharp_grpc_compile_windows"));
        // experimental rules never appear
        assert!(!has("csharp_grpc_library_ubuntu1804"));

        let task = &yaml["tasks"]["python_proto_compile_ubuntu1804"];
        assert_eq!(
            task["working_directory"].as_str(),
            Some("example/python/python_proto_compile")
        );
    }

    #[test]
    fn test_check_yaml_rejects_garbage() {
        assert_matches!(
            check_yaml("x.yml", "tasks: [unclosed"),
            Err(GenerationError::MalformedOutput { .. })
        );
        assert_matches!(
            check_yaml("x.yml", "other: 1"),
            Err(GenerationError::MalformedOutput { message, .. }) if message.contains("tasks")
        );
    }
}
