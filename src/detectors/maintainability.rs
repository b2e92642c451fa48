//! Maintainability detectors: size, markers and documentation.

use super::source::find_functions;
use super::{Detector, DetectorFailure};
use crate::core::{Category, FileMetadata, Finding, Language, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

pub const MAX_FUNCTION_LINES: usize = 50;
pub const MAX_FILE_LINES: usize = 500;
pub const MAX_MAGIC_NUMBERS: usize = 5;
pub const LONG_LINE_CHARS: usize = 100;
pub const MAX_LONG_LINES: usize = 5;
/// Longest run of consecutive blank lines left alone.
pub const MAX_BLANK_RUN: usize = 2;

static TODO_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b").expect("valid regex"));
static MULTI_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2,}\b").expect("valid regex"));
static PY_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:async\s+def|def|class)\s+\w+").expect("valid regex"));

/// Functions longer than [`MAX_FUNCTION_LINES`].
pub struct LongFunctionDetector;

impl Detector for LongFunctionDetector {
    fn id(&self) -> &str {
        "long-function"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let findings = find_functions(content, meta.language)
            .into_iter()
            .filter(|span| span.len() > MAX_FUNCTION_LINES)
            .map(|span| {
                Finding::new(
                    self.id(),
                    "long-function",
                    self.category(),
                    Severity::Medium,
                    &meta.path,
                    format!(
                        "Function '{}' is {} lines long (limit {}); split it up",
                        span.name,
                        span.len(),
                        MAX_FUNCTION_LINES
                    ),
                )
                .spanning(span.start, span.end)
            })
            .collect();
        Ok(findings)
    }
}

/// Files longer than [`MAX_FILE_LINES`].
pub struct LargeFileDetector;

impl Detector for LargeFileDetector {
    fn id(&self) -> &str {
        "large-file"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let lines = content.lines().count();
        if lines <= MAX_FILE_LINES {
            return Ok(Vec::new());
        }
        Ok(vec![Finding::new(
            self.id(),
            "large-file",
            self.category(),
            Severity::Low,
            &meta.path,
            format!(
                "File has {} lines (limit {}); consider splitting it",
                lines, MAX_FILE_LINES
            ),
        )])
    }
}

/// TODO/FIXME/HACK/XXX markers.
pub struct TodoMarkerDetector;

impl Detector for TodoMarkerDetector {
    fn id(&self) -> &str {
        "todo-marker"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let findings = content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let marker = TODO_MARKER.captures(line)?.get(1)?.as_str().to_string();
                Some(
                    Finding::new(
                        self.id(),
                        "todo-marker",
                        self.category(),
                        Severity::Info,
                        &meta.path,
                        format!("{} marker: {}", marker, line.trim()),
                    )
                    .at_line(i + 1),
                )
            })
            .collect();
        Ok(findings)
    }
}

/// Many distinct multi-digit literals.
pub struct MagicNumberDetector;

impl Detector for MagicNumberDetector {
    fn id(&self) -> &str {
        "magic-numbers"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let literals: BTreeSet<&str> = content
            .lines()
            .filter(|line| !meta.language.is_comment_line(line))
            .flat_map(|line| MULTI_DIGIT.find_iter(line).map(|m| m.as_str()))
            .collect();
        if literals.len() <= MAX_MAGIC_NUMBERS {
            return Ok(Vec::new());
        }
        Ok(vec![Finding::new(
            self.id(),
            "magic-numbers",
            self.category(),
            Severity::Info,
            &meta.path,
            format!(
                "{} distinct numeric literals; consider named constants",
                literals.len()
            ),
        )])
    }
}

/// Python files defining functions or classes without a single docstring.
pub struct MissingDocstringDetector;

impl Detector for MissingDocstringDetector {
    fn id(&self) -> &str {
        "missing-docstring"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        if meta.language != Language::Python
            || !PY_DEFINITION.is_match(content)
            || content.contains("\"\"\"")
            || content.contains("'''")
        {
            return Ok(Vec::new());
        }
        Ok(vec![Finding::new(
            self.id(),
            "missing-docstring",
            self.category(),
            Severity::Info,
            &meta.path,
            "No docstrings; document functions and classes",
        )])
    }
}

/// More than [`MAX_LONG_LINES`] lines over [`LONG_LINE_CHARS`] characters.
pub struct LongLinesDetector;

impl Detector for LongLinesDetector {
    fn id(&self) -> &str {
        "long-lines"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let long: Vec<usize> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.chars().count() > LONG_LINE_CHARS)
            .map(|(i, _)| i + 1)
            .collect();
        if long.len() <= MAX_LONG_LINES {
            return Ok(Vec::new());
        }
        Ok(vec![Finding::new(
            self.id(),
            "long-lines",
            self.category(),
            Severity::Info,
            &meta.path,
            format!(
                "{} lines exceed {} characters (first at line {})",
                long.len(),
                LONG_LINE_CHARS,
                long[0]
            ),
        )])
    }
}

/// Runs of more than [`MAX_BLANK_RUN`] consecutive blank lines.
pub struct ExcessiveBlankLinesDetector;

impl Detector for ExcessiveBlankLinesDetector {
    fn id(&self) -> &str {
        "excessive-blank-lines"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        // (first line, length) of each blank run
        let mut runs: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                let run = current.get_or_insert((i + 1, 0));
                run.1 += 1;
            } else if let Some(run) = current.take() {
                runs.push(run);
            }
        }
        runs.extend(current);

        let findings = runs
            .into_iter()
            .filter(|(_, len)| *len > MAX_BLANK_RUN)
            .map(|(start, len)| {
                Finding::new(
                    self.id(),
                    "excessive-blank-lines",
                    self.category(),
                    Severity::Info,
                    &meta.path,
                    format!("{} consecutive blank lines (limit {})", len, MAX_BLANK_RUN),
                )
                .spanning(start, start + len - 1)
            })
            .collect();
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn meta(path: &str) -> FileMetadata {
        FileMetadata {
            path: path.to_string(),
            language: Language::from_path(std::path::Path::new(path)),
            size: 0,
        }
    }

    #[test]
    fn test_long_function_spans_body() {
        let mut source = String::from("def big():\n");
        for i in 0..60 {
            source.push_str(&format!("    x{} = {}\n", i, i));
        }
        source.push_str("def small():\n    pass\n");

        let findings = LongFunctionDetector.analyze(&source, &meta("a.py")).unwrap();
        assert_eq!(findings.len(), 1);
        let range = findings[0].line_range.unwrap();
        assert_eq!((range.start, range.end), (1, 61));
        assert!(findings[0].message.contains("'big'"));
    }

    #[test]
    fn test_large_file_has_no_line_range() {
        let source = "x = 1\n".repeat(MAX_FILE_LINES + 1);
        let findings = LargeFileDetector.analyze(&source, &meta("a.py")).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].line_range.is_none());
        assert!(LargeFileDetector
            .analyze(&"x\n".repeat(MAX_FILE_LINES), &meta("a.py"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_todo_markers() {
        let source = "# TODO: split\nx = 1  # FIXME later\ntodos = []\n";
        let findings = TodoMarkerDetector.analyze(source, &meta("a.py")).unwrap();
        let lines: Vec<_> = findings.iter().filter_map(|f| f.start_line()).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_magic_numbers_count_distinct_literals() {
        let repeated = "a = 42\n".repeat(10);
        assert!(MagicNumberDetector
            .analyze(&repeated, &meta("a.py"))
            .unwrap()
            .is_empty());

        let distinct = "a = 10\nb = 20\nc = 30\nd = 40\ne = 50\nf = 60\n";
        assert_eq!(
            MagicNumberDetector
                .analyze(distinct, &meta("a.py"))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_missing_docstring_only_for_python_definitions() {
        let undocumented = indoc! {r#"
            def f():
                return 1
        "#};
        let documented = indoc! {r#"
            def f():
                """Return one."""
                return 1
        "#};
        assert_eq!(
            MissingDocstringDetector
                .analyze(undocumented, &meta("a.py"))
                .unwrap()
                .len(),
            1
        );
        assert!(MissingDocstringDetector
            .analyze(documented, &meta("a.py"))
            .unwrap()
            .is_empty());
        assert!(MissingDocstringDetector
            .analyze("", &meta("empty.py"))
            .unwrap()
            .is_empty());
        assert!(MissingDocstringDetector
            .analyze("function f() {}\n", &meta("a.js"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_long_lines_threshold() {
        let long = "x".repeat(LONG_LINE_CHARS + 1);
        let five = format!("{}\n", long).repeat(MAX_LONG_LINES);
        assert!(LongLinesDetector.analyze(&five, &meta("a.py")).unwrap().is_empty());
        let six = format!("{}\n", long).repeat(MAX_LONG_LINES + 1);
        assert_eq!(LongLinesDetector.analyze(&six, &meta("a.py")).unwrap().len(), 1);
    }

    #[test]
    fn test_blank_runs_over_limit_are_reported() {
        let source = "a = 1\n\n\nb = 2\n\n\n   \n\nc = 3\n";
        let findings = ExcessiveBlankLinesDetector.analyze(source, &meta("a.py")).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line_range, Some(crate::core::LineRange::new(5, 8)));
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].message.starts_with("4 consecutive blank lines"));
    }

    #[test]
    fn test_trailing_blank_run_is_reported() {
        let source = format!("x = 1{}", "\n".repeat(MAX_BLANK_RUN + 2));
        let findings = ExcessiveBlankLinesDetector.analyze(&source, &meta("a.py")).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].start_line(), Some(2));
    }
}
