//! Static checks over ruleset files.
//!
//! | Code | Severity | Meaning |
//! |------|----------|---------|
//! | E001 | error | File is missing or not valid JSON |
//! | E002 | error | Malformed step, unknown fragment, reserved or recursive macro, bad schema |
//! | E003 | error | A field calls a method that is neither a built-in nor a macro |
//! | W001 | warning | A directive name outside the built-in vocabulary |
//! | W002 | warning | The same directive appears twice in one field |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::directive::Directive;
use crate::error::{RuleError, RulesetError};
use crate::flatten::render_tag;
use crate::loader::load_document;
use crate::ruleset::{escape_pointer, Ruleset};
use crate::vocabulary::Builtin;

/// Ordered so that the worst severity of a file is its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// JSON Pointer into the ruleset document, e.g. `/fields/email/2`.
    pub pointer: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &'static str, pointer: impl Into<String>, message: impl ToString) -> Self {
        Self {
            severity: Severity::Error,
            code,
            pointer: pointer.into(),
            message: message.to_string(),
        }
    }

    fn warning(code: &'static str, pointer: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            pointer: pointer.into(),
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Warning,
    Error,
}

impl FileStatus {
    fn of(diagnostics: &[Diagnostic]) -> Self {
        match diagnostics.iter().map(|d| d.severity).max() {
            None => FileStatus::Ok,
            Some(Severity::Warning) => FileStatus::Warning,
            Some(Severity::Error) => FileStatus::Error,
        }
    }
}

/// Diagnostics for one ruleset file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    /// Path relative to the linted root.
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn fails(&self, strict: bool) -> bool {
        match self.status {
            FileStatus::Ok => false,
            FileStatus::Warning => strict,
            FileStatus::Error => true,
        }
    }
}

/// Aggregate over every file under a linted path.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub strict: bool,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    fn tally(path: &Path, strict: bool, results: Vec<FileResult>) -> Self {
        let failed = results.iter().filter(|r| r.fails(strict)).count();
        Self {
            path: path.to_path_buf(),
            strict,
            files_checked: results.len(),
            passed: results.len() - failed,
            failed,
            errors: results.iter().map(|r| r.count(Severity::Error)).sum(),
            warnings: results.iter().map(|r| r.count(Severity::Warning)).sum(),
            results,
        }
    }

    /// True if no file failed. In strict mode warnings count as failures.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Lint a ruleset file, or every `.json` file below a directory.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results = ruleset_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();
    LintResult::tally(path, strict, results)
}

/// Lint a single ruleset file. `root` is stripped from the reported path.
pub fn lint_file(file: &Path, root: &Path) -> FileResult {
    let diagnostics = match load_document(file) {
        Err(e) => vec![Diagnostic::error("E001", "", e)],
        Ok(doc) => match Ruleset::from_value(&doc) {
            Err(e) => vec![Diagnostic::error("E002", error_pointer(&e), e)],
            Ok(ruleset) => check_ruleset(&ruleset),
        },
    };

    let status = FileStatus::of(&diagnostics);
    tracing::debug!(file = %file.display(), ?status, "linted ruleset");
    FileResult {
        file: file.strip_prefix(root).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

fn check_ruleset(ruleset: &Ruleset) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for field in ruleset.field_names() {
        match ruleset.builder(field) {
            Ok(rules) => {
                let pointer = format!("/fields/{}", escape_pointer(field));
                diagnostics.extend(check_directives(rules.directives(), &pointer));
            }
            Err(RulesetError::Rule {
                path,
                source: source @ RuleError::UnknownMethod { .. },
            }) => diagnostics.push(Diagnostic::error("E003", path, source)),
            Err(e) => diagnostics.push(Diagnostic::error("E002", error_pointer(&e), e)),
        }
    }
    diagnostics
}

fn error_pointer(err: &RulesetError) -> String {
    match err {
        RulesetError::InvalidStep { path, .. }
        | RulesetError::UnknownFragment { path, .. }
        | RulesetError::InvalidSchema { path, .. }
        | RulesetError::MacroCycle { path, .. }
        | RulesetError::Rule { path, .. } => path.clone(),
        RulesetError::Load(_) | RulesetError::UnknownField { .. } => String::new(),
    }
}

/// Warnings for one field's directives.
fn check_directives(directives: &[Directive], pointer: &str) -> Vec<Diagnostic> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for directive in directives {
        // (rendered text, directive name, is a built-in)
        let entries: Vec<(String, String, bool)> = match directive {
            Directive::Tag(tag) => vec![(
                render_tag(tag),
                tag.name().to_string(),
                tag.builtin().is_some(),
            )],
            // Only literals may carry several pipe-separated directives.
            Directive::Literal(s) => s
                .split('|')
                .map(|part| {
                    let name = part.split(':').next().unwrap_or(part);
                    (part.to_string(), name.to_string(), Builtin::parse(name).is_some())
                })
                .collect(),
            Directive::Opaque(_) => Vec::new(),
        };

        for (text, name, known) in entries {
            if !known {
                warnings.push(Diagnostic::warning(
                    "W001",
                    pointer,
                    format!("unrecognized directive '{}'", name),
                ));
            }
            if !seen.insert(text.clone()) {
                warnings.push(Diagnostic::warning(
                    "W002",
                    pointer,
                    format!("duplicate directive '{}'", text),
                ));
            }
        }
    }
    warnings
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// `.json` files at or below `path`, sorted.
fn ruleset_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_json(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if is_json(&entry_path) {
                files.push(entry_path);
            }
        }
    }
    files.sort();
    files
}
