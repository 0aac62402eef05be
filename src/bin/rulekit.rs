//! rulekit CLI
//!
//! Command-line interface for composing and linting declarative rulesets.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rulekit::{composed_to_json, lint, Builtin, FileStatus, LintResult, Ruleset, Severity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rulekit")]
#[command(about = "Compose ordered validation rule lists from declarative rulesets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a ruleset into flattened per-field rule lists
    Compose {
        /// Ruleset file
        ruleset: PathBuf,

        /// Only compose this field (prints a bare array)
        #[arg(long)]
        field: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint ruleset files for errors (syntax, bad steps, unknown methods)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// List the built-in directive vocabulary
    Vocabulary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compose {
            ruleset,
            field,
            output,
            pretty,
        } => run_compose(&ruleset, field.as_deref(), output, pretty),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),

        Commands::Vocabulary { json } => run_vocabulary(json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_compose(
    path: &Path,
    field: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let ruleset = Ruleset::from_file(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let composed = match field {
        Some(field) => ruleset.compose_field(field).map(|c| c.to_json()),
        None => ruleset.compose().map(|c| composed_to_json(&c)),
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&composed)
    } else {
        serde_json::to_string(&composed)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_vocabulary(json: bool) -> Result<(), u8> {
    if json {
        let entries: Vec<serde_json::Value> = Builtin::ALL
            .iter()
            .map(|b| serde_json::json!({ "name": b.as_str(), "params": b.params() }))
            .collect();
        println!("{}", serde_json::Value::Array(entries));
    } else {
        for builtin in Builtin::ALL {
            if builtin.params().is_empty() {
                println!("{}", builtin);
            } else {
                println!("{}:{}", builtin, builtin.params().join(","));
            }
        }
    }
    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?;
            println!("{}", json);
        }
        _ => print_lint_report(&result, quiet),
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";

fn paint(color: &str, text: &str) -> String {
    format!("\x1b[{}m{}\x1b[0m", color, text)
}

/// One line per diagnostic, `file#pointer`, then a summary.
fn print_lint_report(result: &LintResult, quiet: bool) {
    for file in &result.results {
        if file.status == FileStatus::Ok {
            if !quiet {
                println!("{} {}", paint(GREEN, "ok"), file.file.display());
            }
            continue;
        }

        for diag in &file.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => (RED, "error"),
                Severity::Warning if quiet => continue,
                Severity::Warning => (YELLOW, "warning"),
            };
            println!(
                "{}[{}] {}#{}: {}",
                paint(color, label),
                diag.code,
                file.file.display(),
                diag.pointer,
                diag.message
            );
        }
    }

    let summary = format!(
        "{} files checked: {} passed, {} failed ({} errors, {} warnings)",
        result.files_checked, result.passed, result.failed, result.errors, result.warnings
    );
    if result.is_ok() {
        if !quiet {
            println!("{}", paint(GREEN, &summary));
        }
    } else {
        println!("{}", paint(RED, &summary));
    }
}
