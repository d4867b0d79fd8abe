use clap::Parser;
use proto_rulegen::codegen::WriteReport;
use proto_rulegen::{CliArgs, GeneratorConfig, LoggingConfig, init_logging, run};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    // stdout is reserved for the drift report.
    let logging_config = LoggingConfig::from_env().with_stdout_reserved();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = GeneratorConfig::from_args(cli)?;

    let outcome = run(&config)?;

    if !outcome.report.is_clean() {
        print_drift(&outcome.report)?;
        anyhow::bail!(
            "{} generated file(s) out of date under {}",
            outcome.report.drifted.len(),
            config.output_root.display()
        );
    }

    Ok(())
}

fn print_drift(report: &WriteReport) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for drift in &report.drifted {
        if drift.missing {
            writeln!(out, "missing: {}", drift.path.display())?;
        }
        write!(out, "{}", drift.diff)?;
    }
    out.flush()
}
