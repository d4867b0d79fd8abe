use super::common::{
    ASPECT_RULE, GRPC_COMPILE_EXAMPLE, GRPC_LIBRARY_EXAMPLE, GRPC_WORKSPACE,
    PROTO_COMPILE_EXAMPLE, PROTO_LIBRARY_EXAMPLE, PROTO_WORKSPACE, RULE_DOC,
    aspect_proto_compile_attrs,
};
use crate::model::{Flag, Language, Rule, RuleKind, SkipPolicy};
use crate::template::{TemplateId, TemplateSetBuilder};

const LIBRARY_WORKSPACE_BASE: TemplateId = TemplateId::from_static("csharp_library_workspace_base");
const GRPC_LIBRARY_WORKSPACE_SUFFIX: TemplateId =
    TemplateId::from_static("csharp_grpc_library_workspace_suffix");
const PROTO_LIBRARY_WORKSPACE: TemplateId = TemplateId::from_static("csharp_proto_library_workspace");
const GRPC_LIBRARY_WORKSPACE: TemplateId = TemplateId::from_static("csharp_grpc_library_workspace");

const LIBRARY_RULE_BASE: TemplateId = TemplateId::from_static("csharp_library_rule_base");
const PROTO_LIBRARY_RULE_SUFFIX: TemplateId = TemplateId::from_static("csharp_proto_library_rule_suffix");
const GRPC_LIBRARY_RULE_SUFFIX: TemplateId = TemplateId::from_static("csharp_grpc_library_rule_suffix");
const PROTO_LIBRARY_RULE: TemplateId = TemplateId::from_static("csharp_proto_library_rule");
const GRPC_LIBRARY_RULE: TemplateId = TemplateId::from_static("csharp_grpc_library_rule");

const NOTES: TemplateId = TemplateId::from_static("csharp_notes");

const PROTO_PLUGIN: &str = "//csharp:csharp_plugin";
const GRPC_PLUGIN: &str = "//csharp:grpc_csharp_plugin";

const LIBRARY_WORKSPACE_BASE_SRC: &str = r#"load("@rules_proto_grpc//{{ lang.dir }}:repositories.bzl", rules_proto_grpc_{{ lang.name }}_repos = "{{ lang.name }}_repos")

rules_proto_grpc_{{ lang.name }}_repos()

load(
    "@io_bazel_rules_dotnet//dotnet:defs.bzl",
    "core_register_sdk",
    "dotnet_register_toolchains",
    "dotnet_repositories",
)

core_version = "v2.1.503"

dotnet_register_toolchains(
    core_version = core_version,
)

core_register_sdk(
    name = "core_sdk",
    core_version = core_version,
)

dotnet_repositories()

load("@rules_proto_grpc//csharp/nuget:packages.bzl", nuget_packages = "packages")

nuget_packages()

load("@rules_proto_grpc//csharp/nuget:nuget.bzl", "nuget_protobuf_packages")

nuget_protobuf_packages()
"#;

const GRPC_LIBRARY_WORKSPACE_SUFFIX_SRC: &str = r#"
load("@rules_proto_grpc//csharp/nuget:nuget.bzl", "nuget_grpc_packages")

nuget_grpc_packages()
"#;

const LIBRARY_RULE_BASE_SRC: &str = r#"load("//{{ lang.dir }}:{{ lang.name }}_{{ rule.kind }}_compile.bzl", "{{ lang.name }}_{{ rule.kind }}_compile")
load("@io_bazel_rules_dotnet//dotnet:defs.bzl", "core_library")

def {{ rule.name }}(**kwargs):
    # Compile protos
    name_pb = kwargs.get("name") + "_pb"
    {{ lang.name }}_{{ rule.kind }}_compile(
        name = name_pb,
        **{k: v for (k, v) in kwargs.items() if k in ("deps", "verbose")} # Forward args
    )
"#;

const PROTO_LIBRARY_RULE_SUFFIX_SRC: &str = r#"
    # Create {{ lang.name }} library
    core_library(
        name = kwargs.get("name"),
        srcs = [name_pb],
        deps = PROTO_DEPS,
        visibility = kwargs.get("visibility"),
    )

PROTO_DEPS = [
    "@google.protobuf//:netstandard1.0_core",
    "@io_bazel_rules_dotnet//dotnet/stdlib.core:system.io.dll",
]
"#;

const GRPC_LIBRARY_RULE_SUFFIX_SRC: &str = r#"
    # Create {{ lang.name }} library
    core_library(
        name = kwargs.get("name"),
        srcs = [name_pb],
        deps = GRPC_DEPS,
        visibility = kwargs.get("visibility"),
    )

GRPC_DEPS = [
    "@google.protobuf//:netstandard1.0_core",
    "@io_bazel_rules_dotnet//dotnet/stdlib.core:system.io.dll",
    "@grpc.core//:netstandard1.5_core",
    "@system.interactive.async//:netstandard2.0_core",
]
"#;

const NOTES_SRC: &str = r#"Rules for generating {{ lang.display_name }} protobuf and gRPC `.cs` files and libraries using standard Protocol Buffers and gRPC. Libraries are created with `core_library` from [rules_dotnet](https://github.com/bazelbuild/rules_dotnet)

**NOTE 1**: the {{ lang.name }}_* rules currently don't play nicely with sandboxing. You may see errors like:

~~~python
The user's home directory could not be determined. Set the 'DOTNET_CLI_HOME' environment variable to specify the directory to use.
~~~

or

~~~python
System.ArgumentNullException: Value cannot be null.
Parameter name: path1
   at System.IO.Path.Combine(String path1, String path2)
   at Microsoft.DotNet.Configurer.CliFallbackFolderPathCalculator.get_DotnetUserProfileFolderPath()
   at Microsoft.DotNet.Configurer.FirstTimeUseNoticeSentinel..ctor(CliFallbackFolderPathCalculator cliFallbackFolderPathCalculator)
   at Microsoft.DotNet.Cli.Program.ProcessArgs(String[] args, ITelemetry telemetryClient)
   at Microsoft.DotNet.Cli.Program.Main(String[] args)
~~~

To remedy this, use --strategy=CoreCompile=standalone for the {{ lang.name }} rules (put it in your .bazelrc file).

**NOTE 2**: the {{ lang.name }} nuget dependency sha256 values do not appear stable."#;

pub fn define_templates(builder: TemplateSetBuilder) -> TemplateSetBuilder {
    builder
        .template(LIBRARY_WORKSPACE_BASE, LIBRARY_WORKSPACE_BASE_SRC)
        .template(GRPC_LIBRARY_WORKSPACE_SUFFIX, GRPC_LIBRARY_WORKSPACE_SUFFIX_SRC)
        .compose(PROTO_LIBRARY_WORKSPACE, [&LIBRARY_WORKSPACE_BASE])
        .compose(
            GRPC_LIBRARY_WORKSPACE,
            [&LIBRARY_WORKSPACE_BASE, &GRPC_LIBRARY_WORKSPACE_SUFFIX],
        )
        .template(LIBRARY_RULE_BASE, LIBRARY_RULE_BASE_SRC)
        .template(PROTO_LIBRARY_RULE_SUFFIX, PROTO_LIBRARY_RULE_SUFFIX_SRC)
        .template(GRPC_LIBRARY_RULE_SUFFIX, GRPC_LIBRARY_RULE_SUFFIX_SRC)
        .compose(PROTO_LIBRARY_RULE, [&LIBRARY_RULE_BASE, &PROTO_LIBRARY_RULE_SUFFIX])
        .compose(GRPC_LIBRARY_RULE, [&LIBRARY_RULE_BASE, &GRPC_LIBRARY_RULE_SUFFIX])
        .template(NOTES, NOTES_SRC)
}

fn library_flags() -> Vec<Flag> {
    vec![Flag::new(
        "build",
        "strategy",
        "CoreCompile=standalone",
        "dotnet SDK desperately wants to find the HOME directory",
    )]
}

pub fn language() -> Language {
    Language::new("csharp", "csharp", "C#")
        .notes(NOTES)
        .skip_test_platforms(SkipPolicy::All)
        .rule(
            Rule::new("csharp_proto_compile", RuleKind::Proto)
                .implementation(ASPECT_RULE)
                .plugins([PROTO_PLUGIN])
                .workspace_example(PROTO_WORKSPACE)
                .build_example(PROTO_COMPILE_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates C# protobuf `.cs` artifacts")
                .attrs(aspect_proto_compile_attrs())
                .skip_test_platforms(SkipPolicy::None),
        )
        .rule(
            Rule::new("csharp_grpc_compile", RuleKind::Grpc)
                .implementation(ASPECT_RULE)
                .plugins([PROTO_PLUGIN, GRPC_PLUGIN])
                .workspace_example(GRPC_WORKSPACE)
                .build_example(GRPC_COMPILE_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates C# protobuf+gRPC `.cs` artifacts")
                .attrs(aspect_proto_compile_attrs())
                .skip_test_platforms(SkipPolicy::None),
        )
        // Library rules depend on nuget packages that fail to resolve
        .rule(
            Rule::new("csharp_proto_library", RuleKind::Proto)
                .implementation(PROTO_LIBRARY_RULE)
                .plugins([PROTO_PLUGIN])
                .workspace_example(PROTO_LIBRARY_WORKSPACE)
                .build_example(PROTO_LIBRARY_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates a C# protobuf library using `core_library` from `rules_dotnet`")
                .attrs(aspect_proto_compile_attrs())
                .flags(library_flags())
                .experimental(),
        )
        .rule(
            Rule::new("csharp_grpc_library", RuleKind::Grpc)
                .implementation(GRPC_LIBRARY_RULE)
                .plugins([PROTO_PLUGIN, GRPC_PLUGIN])
                .workspace_example(GRPC_LIBRARY_WORKSPACE)
                .build_example(GRPC_LIBRARY_EXAMPLE)
                .documentation(RULE_DOC)
                .doc("Generates a C# protobuf+gRPC library using `core_library` from `rules_dotnet`")
                .attrs(aspect_proto_compile_attrs())
                .flags(library_flags())
                .experimental(),
        )
}
