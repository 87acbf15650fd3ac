//! Placeholder substitution over a chart source tree
//!
//! The source folder is mirrored into the target folder. Files with a
//! `json`, `tpl`, `yml` or `yaml` extension that match no exclusion rule have
//! their `${name}` placeholders replaced line by line; every other file is
//! copied byte for byte.
//!
//! # Token grammar
//!
//! | Input          | Output                                  |
//! |----------------|-----------------------------------------|
//! | `${name}`      | resolved value, or `${name}` if unknown |
//! | `\${name}`     | `${name}` (one backslash consumed)      |
//! | `\\${name}`    | unchanged, no lookup                    |
//!
//! Names end at the first `}`. Values are inserted literally and never
//! scanned again. Line terminators (`\n`, `\r\n`, or none on the last line)
//! are written back exactly as read.

use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::exclusion::ExclusionSet;
use crate::properties::PropertyResolver;

/// Extensions whose files are scanned for placeholders
pub const SUBSTITUTED_EXTENSIONS: [&str; 4] = ["json", "tpl", "yml", "yaml"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\*)\$\{([^}]*)\}").expect("valid regex"));

/// A `${name}` span found in a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken<'a> {
    /// Full matched text including any leading backslashes
    pub raw: &'a str,
    /// Property name between the braces
    pub name: &'a str,
    /// Number of backslashes directly before `$`
    pub backslashes: usize,
}

impl<'a> PlaceholderToken<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        Some(Self {
            raw: caps.get(0)?.as_str(),
            name: caps.get(2)?.as_str(),
            backslashes: caps.get(1).map(|m| m.len()).unwrap_or(0),
        })
    }

    /// `\${name}`: emitted literally without the backslash
    pub fn is_escaped(&self) -> bool {
        self.backslashes == 1
    }

    /// A run of two or more backslashes is not an escape marker; the span is kept as-is
    pub fn is_verbatim(&self) -> bool {
        self.backslashes > 1
    }

    /// The token text without leading backslashes
    pub fn unescaped(&self) -> &'a str {
        &self.raw[self.backslashes..]
    }
}

/// Find every placeholder in a line, left to right
pub fn scan(line: &str) -> Vec<PlaceholderToken<'_>> {
    PLACEHOLDER
        .captures_iter(line)
        .filter_map(|caps| PlaceholderToken::from_captures(&caps))
        .collect()
}

/// Result of substituting a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSubstitution {
    pub text: String,
    /// Property names that could not be resolved, in order of appearance
    pub unresolved: Vec<String>,
}

/// Substitute every placeholder of a single line (without its terminator)
pub fn substitute_line(line: &str, resolver: &PropertyResolver) -> LineSubstitution {
    let mut text = String::with_capacity(line.len());
    let mut unresolved = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(line) {
        let (Some(whole), Some(token)) = (caps.get(0), PlaceholderToken::from_captures(&caps))
        else {
            continue;
        };
        text.push_str(&line[last..whole.start()]);

        if token.is_verbatim() {
            text.push_str(token.raw);
        } else if token.is_escaped() {
            text.push_str(token.unescaped());
        } else {
            match resolver.resolve(token.name) {
                Some(resolved) => text.push_str(&resolved.value),
                None => {
                    text.push_str(token.raw);
                    unresolved.push(token.name.to_string());
                }
            }
        }

        last = whole.end();
    }

    text.push_str(&line[last..]);
    LineSubstitution { text, unresolved }
}

/// Whether a file (path relative to the chart folder) gets placeholder substitution
pub fn is_candidate(relative: &Path, exclusions: &ExclusionSet) -> bool {
    has_substituted_extension(relative) && !exclusions.is_excluded(relative)
}

fn has_substituted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUBSTITUTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// A placeholder that no property source could resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedProperty {
    pub name: String,
    /// Source file, relative to the chart folder
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
}

/// Summary of a substitution run
#[derive(Debug, Clone, Default)]
pub struct SubstitutionReport {
    /// Files rewritten with placeholder substitution (relative paths)
    pub substituted: Vec<PathBuf>,
    /// Files copied verbatim (relative paths)
    pub copied: Vec<PathBuf>,
    /// Candidate-extension files copied verbatim because an exclusion matched
    pub excluded: Vec<PathBuf>,
    pub unresolved: Vec<UnresolvedProperty>,
}

impl SubstitutionReport {
    /// Total number of files written to the target folder
    pub fn files_processed(&self) -> usize {
        self.substituted.len() + self.copied.len()
    }
}

/// Mirror `source_dir` into `target_dir`, substituting placeholders in candidate files
///
/// Fails when the source folder contains no files at all.
pub fn substitute(
    source_dir: &Path,
    target_dir: &Path,
    resolver: &PropertyResolver,
    exclusions: &ExclusionSet,
) -> Result<SubstitutionReport> {
    if !source_dir.is_dir() {
        return Err(CoreError::ChartFolderNotFound {
            path: source_dir.to_path_buf(),
        });
    }

    tracing::debug!("Processing helm files in directory {}", source_dir.display());

    let mut report = SubstitutionReport::default();

    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(source_dir).unwrap_or(path).to_path_buf();
        let target = target_dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::debug!("Processing helm file {} -> {}", path.display(), target.display());

        if !has_substituted_extension(&relative) {
            fs::copy(path, &target)?;
            report.copied.push(relative);
            continue;
        }

        if let Some(rule) = exclusions.matching_rule(&relative) {
            tracing::debug!(
                "Skipping substitution for {} (excluded by '{}')",
                relative.display(),
                rule.as_str()
            );
            fs::copy(path, &target)?;
            report.excluded.push(relative.clone());
            report.copied.push(relative);
            continue;
        }

        let unresolved = substitute_file(path, &target, &relative, resolver)?;
        for missing in &unresolved {
            tracing::warn!(
                "Could not resolve property '{}' in {} (line {}), keeping placeholder",
                missing.name,
                path.display(),
                missing.line
            );
        }
        report.unresolved.extend(unresolved);
        report.substituted.push(relative);
    }

    if report.files_processed() == 0 {
        return Err(CoreError::EmptyChartFolder {
            path: source_dir.to_path_buf(),
        });
    }

    Ok(report)
}

fn substitute_file(
    source: &Path,
    target: &Path,
    relative: &Path,
    resolver: &PropertyResolver,
) -> Result<Vec<UnresolvedProperty>> {
    let bytes = fs::read(source)?;
    let content = String::from_utf8(bytes).map_err(|_| CoreError::NotUtf8 {
        path: source.to_path_buf(),
    })?;

    let mut output = String::with_capacity(content.len());
    let mut unresolved = Vec::new();

    for (index, segment) in content.split_inclusive('\n').enumerate() {
        let (line, terminator) = split_terminator(segment);
        let result = substitute_line(line, resolver);
        output.push_str(&result.text);
        output.push_str(terminator);

        unresolved.extend(result.unresolved.into_iter().map(|name| UnresolvedProperty {
            name,
            file: relative.to_path_buf(),
            line: index + 1,
        }));
    }

    fs::write(target, output)?;
    Ok(unresolved)
}

fn split_terminator(segment: &str) -> (&str, &str) {
    if let Some(line) = segment.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = segment.strip_suffix('\n') {
        (line, "\n")
    } else {
        (segment, "")
    }
}
