//! Performance detectors: loop shapes and blocking calls.

use super::source::{code_lines, LoopNesting};
use super::{Detector, DetectorFailure};
use crate::core::{Category, FileMetadata, Finding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

const NESTED_LOOP_DEPTH: usize = 3;
const BLOCKING_SLEEP_SECS: f64 = 1.0;

static RANGE_LEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfor\s+\w+\s+in\s+range\s*\(\s*len\s*\([^)]+\)\s*\)").expect("valid regex")
});
static LOOP_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\}\s*)?(?:for|while|loop|foreach|do)\b|\.forEach\s*\(").expect("valid regex")
});
static SLEEP_SECS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:time\.)?sleep\s*\(\s*(\d+(?:\.\d+)?)\s*\)|Duration::from_secs\s*\(\s*(\d+)\s*\)")
        .expect("valid regex")
});
static SLEEP_MILLIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bThread\.sleep\s*\(\s*(\d+)L?\s*\)|Duration::from_millis\s*\(\s*(\d+)\s*\)")
        .expect("valid regex")
});
static THREAD_SLEEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:thread::)?sleep\s*\(\s*Duration::").expect("valid regex"));
static STRING_APPEND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*[\w.\[\]]+\s*\+=\s*(?:f?["'`]|str\s*\(|String::from|&?format!)"#)
        .expect("valid regex")
});

/// Index loops over `range(len(...))`.
pub struct RangeLenLoopDetector;

impl Detector for RangeLenLoopDetector {
    fn id(&self) -> &str {
        "range-len-loop"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let findings = code_lines(content, meta.language)
            .filter(|(_, line)| RANGE_LEN.is_match(line))
            .map(|(line_no, _)| {
                Finding::new(
                    self.id(),
                    "range-len-loop",
                    self.category(),
                    Severity::Low,
                    &meta.path,
                    "Loop over range(len(...)); iterate directly or use enumerate()",
                )
                .at_line(line_no)
            })
            .collect();
        Ok(findings)
    }
}

// Pure function: seconds slept by a recognizable sleep call on this line
fn sleep_seconds(line: &str) -> Option<f64> {
    if let Some(captures) = SLEEP_MILLIS.captures(line) {
        let millis = captures.get(1).or_else(|| captures.get(2))?;
        return millis.as_str().parse::<f64>().ok().map(|ms| ms / 1000.0);
    }
    let captures = SLEEP_SECS.captures(line)?;
    if captures.get(2).is_some() && !THREAD_SLEEP.is_match(line) {
        return None;
    }
    let secs = captures.get(1).or_else(|| captures.get(2))?;
    secs.as_str().parse::<f64>().ok()
}

/// Blocking sleeps of a second or more.
pub struct BlockingSleepDetector;

impl Detector for BlockingSleepDetector {
    fn id(&self) -> &str {
        "blocking-sleep"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let findings = code_lines(content, meta.language)
            .filter_map(|(line_no, line)| {
                let secs = sleep_seconds(line).filter(|s| *s >= BLOCKING_SLEEP_SECS)?;
                Some(
                    Finding::new(
                        self.id(),
                        "blocking-sleep",
                        self.category(),
                        Severity::Medium,
                        &meta.path,
                        format!(
                            "Blocking sleep of {}s; consider an async timer or event",
                            secs
                        ),
                    )
                    .at_line(line_no),
                )
            })
            .collect();
        Ok(findings)
    }
}

/// Loops nested three or more levels deep.
pub struct NestedLoopDetector;

impl Detector for NestedLoopDetector {
    fn id(&self) -> &str {
        "nested-loop"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let mut nesting = LoopNesting::default();
        let mut findings = Vec::new();
        for (line_no, line) in code_lines(content, meta.language) {
            if line.trim().is_empty() {
                continue;
            }
            let header = LOOP_HEADER.is_match(line);
            let depth = nesting.advance(line, header);
            // Reported once per nest, at the header that crosses the threshold
            if header && depth == NESTED_LOOP_DEPTH {
                findings.push(
                    Finding::new(
                        self.id(),
                        "nested-loop",
                        self.category(),
                        Severity::Medium,
                        &meta.path,
                        format!(
                            "Loops nested {} levels deep; complexity grows multiplicatively",
                            depth
                        ),
                    )
                    .at_line(line_no),
                );
            }
        }
        Ok(findings)
    }
}

/// Strings grown with `+=` inside loops.
pub struct StringConcatInLoopDetector;

impl Detector for StringConcatInLoopDetector {
    fn id(&self) -> &str {
        "string-concat-in-loop"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure> {
        let mut nesting = LoopNesting::default();
        let mut findings = Vec::new();
        for (line_no, line) in code_lines(content, meta.language) {
            if line.trim().is_empty() {
                continue;
            }
            let header = LOOP_HEADER.is_match(line);
            let depth = nesting.advance(line, header);
            if !header && depth > 0 && STRING_APPEND.is_match(line) {
                findings.push(
                    Finding::new(
                        self.id(),
                        "string-concat-in-loop",
                        self.category(),
                        Severity::Low,
                        &meta.path,
                        "String built with += inside a loop; collect parts and join",
                    )
                    .at_line(line_no),
                );
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Language;
    use indoc::indoc;

    fn meta(path: &str) -> FileMetadata {
        FileMetadata {
            path: path.to_string(),
            language: Language::from_path(std::path::Path::new(path)),
            size: 0,
        }
    }

    fn lines(findings: &[Finding]) -> Vec<usize> {
        findings.iter().filter_map(|f| f.start_line()).collect()
    }

    #[test]
    fn test_range_len_loop() {
        let source = "for i in range(len(items)):\n    print(items[i])\nfor x in items:\n    pass\n";
        let findings = RangeLenLoopDetector.analyze(source, &meta("a.py")).unwrap();
        assert_eq!(lines(&findings), vec![1]);
    }

    #[test]
    fn test_sleep_threshold() {
        let source = indoc! {r#"
            time.sleep(5)
            time.sleep(0.2)
            sleep(1)
        "#};
        let findings = BlockingSleepDetector.analyze(source, &meta("a.py")).unwrap();
        assert_eq!(lines(&findings), vec![1, 3]);
    }

    #[test]
    fn test_sleep_in_rust_and_java() {
        assert_eq!(sleep_seconds("thread::sleep(Duration::from_secs(2));"), Some(2.0));
        assert_eq!(sleep_seconds("thread::sleep(Duration::from_millis(50));"), Some(0.05));
        assert_eq!(sleep_seconds("Thread.sleep(3000);"), Some(3.0));
        assert_eq!(sleep_seconds("let t = Duration::from_secs(30);"), None);
    }

    #[test]
    fn test_nested_loops_reported_once() {
        let source = indoc! {r#"
            for a in xs:
                for b in ys:
                    for c in zs:
                        for d in ws:
                            pass
            for e in xs:
                pass
        "#};
        let findings = NestedLoopDetector.analyze(source, &meta("a.py")).unwrap();
        assert_eq!(lines(&findings), vec![3]);
    }

    #[test]
    fn test_string_concat_only_inside_loops() {
        let source = indoc! {r#"
            out = ""
            out += "header"
            for row in rows:
                out += f"{row}\n"
                count += 1
        "#};
        let findings = StringConcatInLoopDetector
            .analyze(source, &meta("a.py"))
            .unwrap();
        assert_eq!(lines(&findings), vec![4]);
    }
}
