//! Templates and attrs shared by every built-in language.

use crate::model::Attr;
use crate::template::{TemplateId, TemplateSetBuilder};

pub const ASPECT_RULE: TemplateId = TemplateId::from_static("aspect_rule");
pub const PROTO_WORKSPACE: TemplateId = TemplateId::from_static("proto_workspace");
pub const GRPC_WORKSPACE: TemplateId = TemplateId::from_static("grpc_workspace");
pub const PROTO_COMPILE_EXAMPLE: TemplateId = TemplateId::from_static("proto_compile_example");
pub const GRPC_COMPILE_EXAMPLE: TemplateId = TemplateId::from_static("grpc_compile_example");
pub const PROTO_LIBRARY_EXAMPLE: TemplateId = TemplateId::from_static("proto_library_example");
pub const GRPC_LIBRARY_EXAMPLE: TemplateId = TemplateId::from_static("grpc_library_example");
pub const RULE_DOC: TemplateId = TemplateId::from_static("rule_doc");

const GRPC_WORKSPACE_SUFFIX: TemplateId = TemplateId::from_static("grpc_workspace_suffix");

const ASPECT_RULE_SRC: &str = r#"load("//:plugin.bzl", "ProtoPluginInfo")
load(
    "//:aspect.bzl",
    "ProtoLibraryAspectNodeInfo",
    "proto_compile_aspect_attrs",
    "proto_compile_aspect_impl",
    "proto_compile_attrs",
    "proto_compile_impl",
)

# Create aspect for {{ rule.name }}
{{ rule.name }}_aspect = aspect(
    implementation = proto_compile_aspect_impl,
    provides = [ProtoLibraryAspectNodeInfo],
    attr_aspects = ["deps"],
    attrs = dict(
        proto_compile_aspect_attrs,
        _plugins = attr.label_list(
            doc = "List of protoc plugins to apply",
            providers = [ProtoPluginInfo],
            default = [
{%- for plugin in rule.plugins %}
                Label("{{ plugin.tool }}"),
{%- endfor %}
            ],
        ),
        _prefix = attr.string(
            doc = "String used to disambiguate aspects when generating outputs",
            default = "{{ rule.name }}_aspect",
        )
    ),
    toolchains = ["@rules_proto_grpc//protobuf:toolchain_type"],
)

# Create compile rule to apply aspect
_rule = rule(
    implementation = proto_compile_impl,
    attrs = dict(
        proto_compile_attrs,
        deps = attr.label_list(
            mandatory = True,
            providers = [ProtoInfo, ProtoLibraryAspectNodeInfo],
            aspects = [{{ rule.name }}_aspect],
        ),
    ),
)

# Create macro for converting attrs and passing to compile
def {{ rule.name }}(**kwargs):
    _rule(
        verbose_string = "{}".format(kwargs.get("verbose", 0)),
        merge_directories = {% if lang.skip_directories_merge %}False{% else %}True{% endif %},
        **{k: v for k, v in kwargs.items() if k != "merge_directories"}
    )
"#;

const PROTO_WORKSPACE_SRC: &str = r#"load("@rules_proto_grpc//:repositories.bzl", "rules_proto_grpc_toolchains", "rules_proto_grpc_repos")

rules_proto_grpc_toolchains()

rules_proto_grpc_repos()

load("@rules_proto_grpc//{{ lang.dir }}:repositories.bzl", rules_proto_grpc_{{ lang.name }}_repos = "{{ lang.name }}_repos")

rules_proto_grpc_{{ lang.name }}_repos()
"#;

const GRPC_WORKSPACE_SUFFIX_SRC: &str = r#"
load("@com_github_grpc_grpc//bazel:grpc_deps.bzl", "grpc_deps")

grpc_deps()
"#;

const PROTO_COMPILE_EXAMPLE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:defs.bzl", "{{ rule.name }}")

{{ rule.name }}(
    name = "person_{{ lang.name }}_proto",
    deps = ["@rules_proto_grpc//example/proto:person_proto"],
)
"#;

const GRPC_COMPILE_EXAMPLE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:defs.bzl", "{{ rule.name }}")

{{ rule.name }}(
    name = "greeter_{{ lang.name }}_grpc",
    deps = ["@rules_proto_grpc//example/proto:greeter_grpc"],
)
"#;

const PROTO_LIBRARY_EXAMPLE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:defs.bzl", "{{ rule.name }}")

{{ rule.name }}(
    name = "person_{{ lang.name }}_library",
    deps = ["@rules_proto_grpc//example/proto:person_proto"],
)
"#;

const GRPC_LIBRARY_EXAMPLE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:defs.bzl", "{{ rule.name }}")

{{ rule.name }}(
    name = "greeter_{{ lang.name }}_library",
    deps = ["@rules_proto_grpc//example/proto:greeter_grpc"],
)
"#;

const RULE_DOC_SRC: &str = r#"---

## `{{ rule.name }}`
{% if rule.experimental %}
> NOTE: this rule is EXPERIMENTAL. It may not work correctly or even compile!
{% endif %}
{{ rule.doc }}
{% if workspace_example %}
### `WORKSPACE`

```python
{{ workspace_example }}```
{% endif %}{% if build_example %}
### `BUILD.bazel`

```python
{{ build_example }}```
{% endif %}{% if rule.flags %}
### Flags

| Category | Flag | Value | Description |
| --- | --- | --- | --- |
{% for flag in rule.flags %}| {{ flag.category }} | {{ flag.name }} | {{ flag.value }} | {{ flag.description }} |
{% endfor %}{% endif %}
### Attributes

| Name | Type | Mandatory | Default | Description |
| --- | --- | --- | --- | --- |
{% for attr in rule.attrs %}| `{{ attr.name }}` | `{{ attr.type }}` | {{ attr.mandatory }} | `{{ attr.default }}` | {{ attr.doc }} |
{% endfor %}{% if rule.plugins %}
### Plugins
{% for plugin in rule.plugins %}
- `{{ plugin.tool }}`{% endfor %}
{% endif %}"#;

/// Register the shared templates. Must run before language templates that
/// compose from them.
pub fn define_templates(builder: TemplateSetBuilder) -> TemplateSetBuilder {
    builder
        .template(ASPECT_RULE, ASPECT_RULE_SRC)
        .template(PROTO_WORKSPACE, PROTO_WORKSPACE_SRC)
        .template(GRPC_WORKSPACE_SUFFIX, GRPC_WORKSPACE_SUFFIX_SRC)
        .compose(GRPC_WORKSPACE, [&PROTO_WORKSPACE, &GRPC_WORKSPACE_SUFFIX])
        .template(PROTO_COMPILE_EXAMPLE, PROTO_COMPILE_EXAMPLE_SRC)
        .template(GRPC_COMPILE_EXAMPLE, GRPC_COMPILE_EXAMPLE_SRC)
        .template(PROTO_LIBRARY_EXAMPLE, PROTO_LIBRARY_EXAMPLE_SRC)
        .template(GRPC_LIBRARY_EXAMPLE, GRPC_LIBRARY_EXAMPLE_SRC)
        .template(RULE_DOC, RULE_DOC_SRC)
}

/// Attrs exposed by every aspect-based compile rule.
pub fn aspect_proto_compile_attrs() -> Vec<Attr> {
    vec![
        Attr::new("deps", "list<ProtoInfo>")
            .default_value("[]")
            .doc("List of labels that provide a `ProtoInfo` (such as `native.proto_library`)")
            .mandatory(),
        Attr::new("verbose", "int")
            .default_value("0")
            .doc(
                "The verbosity level. Supported values and results are 1: *show command*, \
                 2: *show command and sandbox after running protoc*, \
                 3: *show command and sandbox before and after running protoc*, \
                 4. *show env, command, expected outputs and sandbox before and after running protoc*",
            ),
    ]
}
