//! Line-level helpers shared by the built-in detectors.

use crate::core::{FileMetrics, Language};
use once_cell::sync::Lazy;
use regex::Regex;

static PY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)").expect("valid regex"));
static RUST_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)")
        .expect("valid regex")
});
static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)")
        .expect("valid regex")
});
static GO_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)").expect("valid regex"));
static KOTLIN_SWIFT_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|internal|protected|open|override|static|suspend)\s+)*(?:fun|func)\s+(\w+)")
        .expect("valid regex")
});
static PHP_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|static|abstract|final)\s+)*function\s+(\w+)")
        .expect("valid regex")
});
static C_LIKE_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|static|final|virtual|override|async|inline|extern|synchronized)\s+)*[\w:<>\[\],*&]+\s+\**(\w+)\s*\([^;]*\)\s*(?:const\s*)?(?:throws\s+[\w.,\s]+)?\{?\s*$")
        .expect("valid regex")
});
static RUBY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)def\s+(?:self\.)?(\w+[?!]?)").expect("valid regex"));

const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "return", "else"];

/// Non-comment lines with their 1-based line numbers.
pub fn code_lines<'a>(
    content: &'a str,
    language: Language,
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    content
        .lines()
        .enumerate()
        .filter(move |(_, line)| !language.is_comment_line(line))
        .map(|(i, line)| (i + 1, line))
}

/// Leading whitespace width, tabs counted as four columns.
pub fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// A function definition located in source text. Lines are 1-based, inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl FunctionSpan {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

fn uses_indentation(language: Language) -> bool {
    matches!(language, Language::Python | Language::Ruby)
}

fn function_name(line: &str, language: Language) -> Option<String> {
    let pattern: &Regex = match language {
        Language::Python => &PY_DEF,
        Language::Ruby => &RUBY_DEF,
        Language::Rust => &RUST_FN,
        Language::JavaScript | Language::TypeScript => &JS_FUNCTION,
        Language::Go => &GO_FUNC,
        Language::Kotlin | Language::Swift => &KOTLIN_SWIFT_FUNC,
        Language::Php => &PHP_FUNCTION,
        Language::Java | Language::C | Language::Cpp | Language::CSharp => &C_LIKE_METHOD,
        Language::Sql | Language::Shell | Language::Other => return None,
    };
    let captures = pattern.captures(line)?;
    let name = captures.get(captures.len() - 1)?.as_str();
    if CONTROL_KEYWORDS.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

/// Lines after a header in which a braced body may still open.
const BODY_OPEN_WINDOW: usize = 3;

// Pure function: last line of each indentation-delimited body, one pass over the file
fn indented_block_ends(lines: &[&str], headers: &[usize]) -> Vec<usize> {
    let mut ends = headers.to_vec();
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut next_header = headers.iter().copied().enumerate().peekable();
    let mut last_code = 0;
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_of(line);
        while let Some(&(slot, base)) = open.last() {
            if base < indent {
                break;
            }
            ends[slot] = last_code;
            open.pop();
        }
        if let Some((slot, _)) = next_header.next_if(|&(_, header)| header == i) {
            open.push((slot, indent));
        }
        last_code = i;
    }
    for (slot, _) in open {
        ends[slot] = last_code;
    }
    ends
}

// Pure function: closing line of each braced body, matching braces in one pass.
// An unclosed body runs to the end of the file; a header whose body does not
// open within the window is a declaration and has no end.
fn braced_block_ends(lines: &[&str], headers: &[usize]) -> Vec<Option<usize>> {
    let last = lines.len().saturating_sub(1);
    let mut first_open: Vec<Option<usize>> = vec![None; lines.len()];
    let mut closes: Vec<Option<usize>> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        for c in line.chars() {
            match c {
                '{' => {
                    let brace = closes.len();
                    if first_open[i].is_none() {
                        first_open[i] = Some(brace);
                    }
                    stack.push(brace);
                    closes.push(None);
                }
                '}' => {
                    if let Some(brace) = stack.pop() {
                        closes[brace] = Some(i);
                    }
                }
                _ => {}
            }
        }
    }

    headers
        .iter()
        .map(|&start| {
            let brace = (start..=(start + BODY_OPEN_WINDOW).min(last)).find_map(|i| first_open[i])?;
            Some(closes[brace].unwrap_or(last))
        })
        .collect()
}

/// Locate function definitions and their extents. Linear in the file length.
pub fn find_functions(content: &str, language: Language) -> Vec<FunctionSpan> {
    let lines: Vec<&str> = content.lines().collect();
    let (headers, names): (Vec<usize>, Vec<String>) = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !language.is_comment_line(line))
        .filter_map(|(i, line)| function_name(line, language).map(|name| (i, name)))
        .unzip();

    let ends: Vec<Option<usize>> = if uses_indentation(language) {
        indented_block_ends(&lines, &headers).into_iter().map(Some).collect()
    } else {
        braced_block_ends(&lines, &headers)
    };

    headers
        .into_iter()
        .zip(names)
        .zip(ends)
        .filter_map(|((start, name), end)| {
            end.map(|end| FunctionSpan {
                name,
                start: start + 1,
                end: end + 1,
            })
        })
        .collect()
}

/// Line and function counts for a file.
pub fn measure(content: &str, language: Language) -> FileMetrics {
    FileMetrics {
        lines: content.lines().count(),
        functions: find_functions(content, language).len(),
    }
}

/// Tracks nesting of loop headers by indentation.
#[derive(Debug, Default)]
pub struct LoopNesting {
    open: Vec<usize>,
}

impl LoopNesting {
    /// Feed the next non-blank code line; returns the loop depth it sits in.
    pub fn advance(&mut self, line: &str, is_loop_header: bool) -> usize {
        let indent = indent_of(line);
        while self.open.last().is_some_and(|&open| open >= indent) {
            self.open.pop();
        }
        if is_loop_header {
            self.open.push(indent);
        }
        self.open.len()
    }
}
