use super::common::{
    ASPECT_RULE, GRPC_COMPILE_EXAMPLE, GRPC_LIBRARY_EXAMPLE, GRPC_WORKSPACE,
    PROTO_COMPILE_EXAMPLE, PROTO_LIBRARY_EXAMPLE, PROTO_WORKSPACE, RULE_DOC,
    aspect_proto_compile_attrs,
};
use crate::model::{Attr, Language, Platform, Rule, RuleKind, SkipPolicy};
use crate::template::{TemplateId, TemplateSetBuilder};

const GRPC_LIBRARY_WORKSPACE: TemplateId = TemplateId::from_static("python_grpc_library_workspace");
const PROTO_LIBRARY_RULE: TemplateId = TemplateId::from_static("python_proto_library_rule");
const GRPC_LIBRARY_RULE: TemplateId = TemplateId::from_static("python_grpc_library_rule");
const GRPCLIB_LIBRARY_RULE: TemplateId = TemplateId::from_static("python_grpclib_library_rule");
const NOTES: TemplateId = TemplateId::from_static("python_notes");

const PROTO_PLUGIN: &str = "//python:python_plugin";
const GRPC_PLUGIN: &str = "//python:grpc_python_plugin";
const GRPCLIB_PLUGIN: &str = "//python:grpclib_python_plugin";

const GRPC_LIBRARY_WORKSPACE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:repositories.bzl", rules_proto_grpc_{{ lang.name }}_repos = "{{ lang.name }}_repos")

rules_proto_grpc_{{ lang.name }}_repos()

load("@com_github_grpc_grpc//bazel:grpc_deps.bzl", "grpc_deps")

grpc_deps()

load("@com_apt_itude_rules_pip//rules:dependencies.bzl", "pip_rules_dependencies")

pip_rules_dependencies()

load("@com_apt_itude_rules_pip//rules:repository.bzl", "pip_repository")

pip_repository(
    name = "rules_proto_grpc_py2_deps",
    python_interpreter = "python2",
    requirements = "@rules_proto_grpc//python:requirements.txt",
)

pip_repository(
    name = "rules_proto_grpc_py3_deps",
    python_interpreter = "python3",
    requirements = "@rules_proto_grpc//python:requirements.txt",
)
"#;

const PROTO_LIBRARY_RULE_SRC: &str = r#"load("//{{ lang.dir }}:{{ lang.name }}_{{ rule.kind }}_compile.bzl", "{{ lang.name }}_{{ rule.kind }}_compile")

def {{ rule.name }}(**kwargs):
    # Compile protos
    name_pb = kwargs.get("name") + "_pb"
    {{ lang.name }}_{{ rule.kind }}_compile(
        name = name_pb,
        **{k: v for (k, v) in kwargs.items() if k in ("deps", "verbose")} # Forward args
    )

    # Create {{ lang.name }} library
    native.py_library(
        name = kwargs.get("name"),
        srcs = [name_pb],
        deps = PROTO_DEPS,
        imports = [name_pb],
        visibility = kwargs.get("visibility"),
    )

PROTO_DEPS = [
    "@com_google_protobuf//:protobuf_python",
]

# Alias
py_proto_library = {{ rule.name }}
"#;

const GRPC_LIBRARY_RULE_SRC: &str = r#"load("//{{ lang.dir }}:{{ lang.name }}_{{ rule.kind }}_compile.bzl", "{{ lang.name }}_{{ rule.kind }}_compile")

def {{ rule.name }}(**kwargs):
    # Compile protos
    name_pb = kwargs.get("name") + "_pb"
    {{ lang.name }}_{{ rule.kind }}_compile(
        name = name_pb,
        **{k: v for (k, v) in kwargs.items() if k in ("deps", "verbose")} # Forward args
    )

    # Pick deps based on python version
    if "python_version" not in kwargs or kwargs["python_version"] == "PY3":
        grpc_deps = GRPC_PYTHON3_DEPS
    elif kwargs["python_version"] == "PY2":
        grpc_deps = GRPC_PYTHON2_DEPS
    else:
        fail("The 'python_version' attribute to {{ rule.name }} must be one of ['PY2', 'PY3']")

    # Create {{ lang.name }} library
    native.py_library(
        name = kwargs.get("name"),
        srcs = [name_pb],
        deps = [
            "@com_google_protobuf//:protobuf_python",
        ] + grpc_deps,
        imports = [name_pb],
        visibility = kwargs.get("visibility"),
    )

GRPC_PYTHON2_DEPS = [
    "@rules_proto_grpc_py2_deps//grpcio",
]

GRPC_PYTHON3_DEPS = [
    "@rules_proto_grpc_py3_deps//grpcio",
]

# Alias
py_grpc_library = {{ rule.name }}
"#;

const GRPCLIB_LIBRARY_RULE_SRC: &str = r#"load("//{{ lang.dir }}:{{ lang.name }}_grpclib_compile.bzl", "{{ lang.name }}_grpclib_compile")

def {{ rule.name }}(**kwargs):
    # Compile protos
    name_pb = kwargs.get("name") + "_pb"
    {{ lang.name }}_grpclib_compile(
        name = name_pb,
        **{k: v for (k, v) in kwargs.items() if k in ("deps", "verbose")} # Forward args
    )

    # Create {{ lang.name }} library
    native.py_library(
        name = kwargs.get("name"),
        srcs = [name_pb],
        deps = [
            "@com_google_protobuf//:protobuf_python",
        ] + GRPC_DEPS,
        imports = [name_pb],
        visibility = kwargs.get("visibility"),
    )

GRPC_DEPS = [
    "@rules_proto_grpc_py3_deps//grpclib",
]

# Alias
py_grpclib_library = {{ rule.name }}
"#;

const NOTES_SRC: &str = "Rules for generating {{ lang.display_name }} protobuf and gRPC `.py` files and libraries using standard Protocol Buffers and gRPC or [grpclib](https://github.com/vmagamedov/grpclib). Libraries are created with the Bazel native `py_library`";

pub fn define_templates(builder: TemplateSetBuilder) -> TemplateSetBuilder {
    builder
        .template(GRPC_LIBRARY_WORKSPACE, GRPC_LIBRARY_WORKSPACE_SRC)
        .template(PROTO_LIBRARY_RULE, PROTO_LIBRARY_RULE_SRC)
        .template(GRPC_LIBRARY_RULE, GRPC_LIBRARY_RULE_SRC)
        .template(GRPCLIB_LIBRARY_RULE, GRPCLIB_LIBRARY_RULE_SRC)
        .template(NOTES, NOTES_SRC)
}

pub fn language() -> Language {
    let python_version = Attr::new("python_version", "string")
        .default_value("PY3")
        .doc("Specify the Python version to use for the bundled dependencies. Valid values are \"PY3\" (the default) and \"PY2\"");

    Language::new("python", "python", "Python")
        .notes(NOTES)
        .rule(
            Rule::new("python_proto_compile", RuleKind::Proto)
                .implementation(ASPECT_RULE)
                .plugins([PROTO_PLUGIN])
                .workspace_example(PROTO_WORKSPACE)
                .build_example(PROTO_COMPILE_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates Python protobuf `.py` artifacts")
                .attrs(aspect_proto_compile_attrs()),
        )
        .rule(
            Rule::new("python_grpc_compile", RuleKind::Grpc)
                .implementation(ASPECT_RULE)
                .plugins([PROTO_PLUGIN, GRPC_PLUGIN])
                .workspace_example(GRPC_WORKSPACE)
                .build_example(GRPC_COMPILE_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates Python protobuf+gRPC `.py` artifacts")
                .attrs(aspect_proto_compile_attrs()),
        )
        .rule(
            Rule::new("python_grpclib_compile", RuleKind::Grpc)
                .implementation(ASPECT_RULE)
                .plugins([PROTO_PLUGIN, GRPCLIB_PLUGIN])
                .workspace_example(GRPC_LIBRARY_WORKSPACE)
                .build_example(GRPC_COMPILE_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates Python protobuf+grpclib `.py` artifacts (supports Python 3 only)")
                .attrs(aspect_proto_compile_attrs()),
        )
        .rule(
            Rule::new("python_proto_library", RuleKind::Proto)
                .implementation(PROTO_LIBRARY_RULE)
                .plugins([PROTO_PLUGIN])
                .workspace_example(PROTO_WORKSPACE)
                .build_example(PROTO_LIBRARY_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates a Python protobuf library using `py_library`")
                .attrs(aspect_proto_compile_attrs()),
        )
        .rule(
            Rule::new("python_grpc_library", RuleKind::Grpc)
                .implementation(GRPC_LIBRARY_RULE)
                .plugins([PROTO_PLUGIN, GRPC_PLUGIN])
                .workspace_example(GRPC_LIBRARY_WORKSPACE)
                .build_example(GRPC_LIBRARY_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates a Python protobuf+gRPC library using `py_library`")
                .attrs(aspect_proto_compile_attrs())
                .attrs([python_version])
                .skip_test_platforms(SkipPolicy::platforms([Platform::Windows])),
        )
        .rule(
            Rule::new("python_grpclib_library", RuleKind::Grpc)
                .implementation(GRPCLIB_LIBRARY_RULE)
                .plugins([PROTO_PLUGIN, GRPCLIB_PLUGIN])
                .workspace_example(GRPC_LIBRARY_WORKSPACE)
                .build_example(GRPC_LIBRARY_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates a Python protobuf+grpclib library using `py_library` (supports Python 3 only)")
                .attrs(aspect_proto_compile_attrs()),
        )
}
