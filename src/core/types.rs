use serde::{Deserialize, Serialize};
use std::path::Path;

/// Issue categories. Every report carries all three, possibly empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Security,
    Performance,
    Maintainability,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Security,
        Category::Performance,
        Category::Maintainability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Maintainability => "maintainability",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "security" => Some(Category::Security),
            "performance" => Some(Category::Performance),
            "maintainability" => Some(Category::Maintainability),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity levels for findings, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical findings feed the prioritizer's density signal.
    pub fn is_severe(&self) -> bool {
        *self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive, 1-based line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn line(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Sql,
    Shell,
    Other,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        static EXTENSION_MAP: &[(&[&str], Language)] = &[
            (&["py", "pyw"], Language::Python),
            (&["js", "jsx", "mjs", "cjs"], Language::JavaScript),
            (&["ts", "tsx", "mts", "cts"], Language::TypeScript),
            (&["java"], Language::Java),
            (&["c", "h"], Language::C),
            (&["cpp", "cc", "cxx", "hpp", "hh"], Language::Cpp),
            (&["cs"], Language::CSharp),
            (&["go"], Language::Go),
            (&["rs"], Language::Rust),
            (&["rb"], Language::Ruby),
            (&["php"], Language::Php),
            (&["kt", "kts"], Language::Kotlin),
            (&["swift"], Language::Swift),
            (&["sql"], Language::Sql),
            (&["sh", "bash", "zsh"], Language::Shell),
        ];

        let ext = ext.to_ascii_lowercase();
        EXTENSION_MAP
            .iter()
            .find(|(exts, _)| exts.contains(&ext.as_str()))
            .map(|(_, lang)| *lang)
            .unwrap_or(Language::Other)
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Other)
    }

    /// Line comment prefixes recognised for this language.
    pub fn comment_prefixes(&self) -> &'static [&'static str] {
        match self {
            Language::Python | Language::Ruby | Language::Shell => &["#"],
            Language::Sql => &["--"],
            Language::Php => &["//", "#"],
            Language::Other => &["#", "//"],
            _ => &["//"],
        }
    }

    pub fn is_comment_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let prefixes = self.comment_prefixes();
        let block_comment = prefixes.contains(&"//")
            && (trimmed.starts_with("/*") || trimmed.starts_with("* ") || trimmed == "*");
        block_comment || prefixes.iter().any(|prefix| trimmed.starts_with(prefix))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
