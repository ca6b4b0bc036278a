//! Userscript Guard CLI - validates userscript anchors before shipping
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Resolves the target path and the rule configuration from the working directory
//! - Handles external concerns like process exit codes and terminal streams
//! - Keeps the output contract: status lines on stdout, failures on stderr

use anyhow::Context;
use clap::Parser;
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use userscript_guard::{GuardError, GuardValidator, OutputFormat, ReportFormatter, ReportOptions};

/// Userscript Guard - static anchor validation for userscripts
#[derive(Parser)]
#[command(name = "userscript-guard")]
#[command(version)]
#[command(about = "Validate that a userscript keeps its required UI anchors before it ships")]
#[command(long_about = "Checks a userscript for style-injection anchors, CSS markers and accessibility rules. Exits 0 when every rule passes and 1 on any violation or a missing file. Rules come from userscript_guard.yaml in the working directory when present.")]
struct Cli {
    /// Userscript to validate (defaults to the configured target in the current directory)
    target: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    init_logging();

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let cwd = env::current_dir().context("Failed to determine the current directory")?;

    let validator = GuardValidator::discover(&cwd).context("Failed to load rule configuration")?;
    let target = validator.resolve_target(cli.target.as_deref(), &cwd);
    tracing::debug!("Validating {}", target.display());

    let report = match validator.validate_file(&target) {
        Ok(report) => report,
        Err(GuardError::TargetNotFound { path }) => {
            eprintln!("❌ target userscript not found: {}", path.display());
            return Ok(1);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to validate {}", target.display()));
        }
    };

    let use_colors = if report.passed() {
        std::io::stdout().is_terminal()
    } else {
        std::io::stderr().is_terminal()
    };

    let formatter = ReportFormatter::new(ReportOptions {
        use_colors,
        base_dir: Some(cwd),
    });
    let output = formatter.format_report(&report, OutputFormat::Human)?;

    if report.passed() {
        print!("{output}");
        Ok(0)
    } else {
        eprint!("{output}");
        Ok(1)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
