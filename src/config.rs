use crate::codegen::WriteMode;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_ROOT: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Root of the rules repository the tree is written under
    pub output_root: PathBuf,
    /// Languages to generate, in the order given; `None` means all
    pub languages: Option<Vec<String>>,
    pub mode: WriteMode,
    /// Where to save the generation receipt, if anywhere
    pub receipt: Option<PathBuf>,
}

impl GeneratorConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            output_root: cli_output_root,
            lang: cli_languages,
            check: cli_check,
            receipt: cli_receipt,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            output_root: file_output_root,
            languages: file_languages,
            check: file_check,
            receipt: file_receipt,
        } = file_config;

        let output_root = cli_output_root
            .or(file_output_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT));

        let languages = cli_languages.or(file_languages).map(|names| {
            let mut seen = Vec::new();
            for name in names {
                let name = name.trim().to_ascii_lowercase();
                if !name.is_empty() && !seen.contains(&name) {
                    seen.push(name);
                }
            }
            seen
        });

        let mode = if cli_check || file_check.unwrap_or(false) {
            WriteMode::Check
        } else {
            WriteMode::Write
        };

        let receipt = cli_receipt.or(file_receipt).map(|path| {
            if path.is_absolute() {
                path
            } else {
                output_root.join(path)
            }
        });

        let config = Self {
            output_root,
            languages,
            mode,
            receipt,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(languages) = &self.languages {
            anyhow::ensure!(
                !languages.is_empty(),
                "--lang was given but names no language"
            );
        }

        if self.output_root.exists() {
            anyhow::ensure!(
                self.output_root.is_dir(),
                "output root {:?} is not a directory",
                self.output_root
            );
        } else {
            anyhow::ensure!(
                self.mode == WriteMode::Write,
                "output root {:?} does not exist; nothing to check",
                self.output_root
            );
        }

        if let Some(receipt) = &self.receipt {
            anyhow::ensure!(
                !receipt.is_dir(),
                "receipt path {:?} is a directory",
                receipt
            );
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "proto-rulegen",
    about = "Generate Bazel protobuf/gRPC rules, examples, docs and CI matrix",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML, JSON or TOML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "PROTO_RULEGEN_OUTPUT_ROOT",
        value_name = "DIR",
        help = "Root of the rules repository to generate into"
    )]
    pub output_root: Option<PathBuf>,

    #[arg(
        long,
        env = "PROTO_RULEGEN_LANG",
        value_name = "LANG",
        value_delimiter = ',',
        help = "Comma-separated list of languages to generate (default: all)"
    )]
    pub lang: Option<Vec<String>>,

    #[arg(
        long,
        env = "PROTO_RULEGEN_CHECK",
        help = "Write nothing; print diffs to stdout and fail if any generated file is missing or out of date"
    )]
    pub check: bool,

    #[arg(
        long,
        env = "PROTO_RULEGEN_RECEIPT",
        value_name = "FILE",
        help = "Write a generation receipt to this path (relative to the output root)"
    )]
    pub receipt: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    output_root: Option<PathBuf>,
    languages: Option<Vec<String>>,
    check: Option<bool>,
    receipt: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };

    Ok(parsed)
}
