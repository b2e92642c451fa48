//! Conventional-commit suggestions for the current working tree.
//!
//! The suggestion is derived from the changed paths alone; findings from the
//! analysis report that fall inside those paths ride along as review notes.

pub mod oracle;

pub use oracle::{request_commentary, OracleDigest, ReasoningOracle};

use crate::aggregation::AnalysisReport;
use crate::core::Finding;
use crate::git::GitStatusSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const FIX_KEYWORDS: &[&str] = &["fix", "bug", "error", "issue"];
const REFACTOR_KEYWORDS: &[&str] = &["refactor", "cleanup", "reorganize"];
const DOC_EXTENSIONS: &[&str] = &[".md", ".txt", ".rst"];
const CONFIG_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml", ".toml"];

/// Files listed in the subject before falling back to a count.
const SUBJECT_FILES: usize = 2;
/// A body listing every file is added above this many files.
const BODY_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Test,
    Chore,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSuggestion {
    pub kind: CommitType,
    pub scope: Option<String>,
    pub subject: String,
    pub body: Option<String>,
    /// Changed paths the suggestion was built from
    pub files: Vec<String>,
    /// Critical and high findings inside the changed files
    pub review_notes: Vec<Finding>,
    /// Number of findings of any severity inside the changed files
    pub related_findings: usize,
}

impl CommitSuggestion {
    /// `type(scope): subject`
    pub fn header(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}({}): {}", self.kind, scope, self.subject),
            None => format!("{}: {}", self.kind, self.subject),
        }
    }

    /// Full commit message, header plus optional body.
    pub fn message(&self) -> String {
        match &self.body {
            Some(body) => format!("{}\n\n{}", self.header(), body),
            None => self.header(),
        }
    }

    pub fn review_lines(&self) -> Vec<String> {
        self.review_notes
            .iter()
            .map(|f| match f.start_line() {
                Some(line) => format!("[{}] {}:{} {}", f.severity, f.path, line, f.message),
                None => format!("[{}] {} {}", f.severity, f.path, f.message),
            })
            .collect()
    }
}

impl fmt::Display for CommitSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub struct CommitSuggester;

impl CommitSuggester {
    pub fn suggest(
        status: &GitStatusSnapshot,
        report: &AnalysisReport,
        description: Option<&str>,
    ) -> CommitSuggestion {
        let touched = status.touched_paths();
        let files: Vec<String> = touched.iter().cloned().collect();
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let related = report.findings_in(&touched);
        let review_notes = related
            .iter()
            .filter(|f| f.severity.is_severe())
            .map(|f| (*f).clone())
            .collect();

        CommitSuggestion {
            kind: classify(&files, description),
            scope: common_scope(&files),
            subject: subject(&files, description),
            body: body(&files),
            related_findings: related.len(),
            review_notes,
            files,
        }
    }
}

// Pure function: first matching rule wins
fn classify(files: &[String], description: Option<&str>) -> CommitType {
    let lower: Vec<String> = files.iter().map(|f| f.to_lowercase()).collect();
    let ends_with_any = |f: &String, exts: &[&str]| exts.iter().any(|e| f.ends_with(e));
    let description = description.map(str::to_lowercase).unwrap_or_default();
    let mentions = |words: &[&str]| words.iter().any(|w| description.contains(w));

    if lower.iter().any(|f| f.contains("test")) {
        CommitType::Test
    } else if lower.iter().any(|f| ends_with_any(f, DOC_EXTENSIONS)) {
        CommitType::Docs
    } else if lower
        .iter()
        .any(|f| f.contains("config") || ends_with_any(f, CONFIG_EXTENSIONS))
    {
        CommitType::Chore
    } else if lower.iter().any(|f| f.contains("style") || f.ends_with(".css")) {
        CommitType::Style
    } else if mentions(FIX_KEYWORDS) {
        CommitType::Fix
    } else if mentions(REFACTOR_KEYWORDS) {
        CommitType::Refactor
    } else {
        CommitType::Feat
    }
}

// Pure function: the one top-level directory shared by nested paths
fn common_scope(files: &[String]) -> Option<String> {
    let dirs: BTreeSet<&str> = files
        .iter()
        .filter_map(|f| f.split_once('/').map(|(first, _)| first))
        .collect();
    if dirs.len() == 1 {
        dirs.into_iter().next().map(str::to_string)
    } else {
        None
    }
}

fn subject(files: &[String], description: Option<&str>) -> String {
    if let Some(description) = description {
        return description.to_string();
    }
    if files.is_empty() {
        return "update project".to_string();
    }
    let listed: Vec<&str> = files.iter().take(SUBJECT_FILES).map(String::as_str).collect();
    let mut subject = format!("update {}", listed.join(", "));
    if files.len() > SUBJECT_FILES {
        subject.push_str(&format!(" and {} other files", files.len() - SUBJECT_FILES));
    }
    subject
}

fn body(files: &[String]) -> Option<String> {
    if files.len() <= BODY_THRESHOLD {
        return None;
    }
    let lines: Vec<String> = files.iter().map(|f| format!("- {}", f)).collect();
    Some(format!("Modified files:\n{}", lines.join("\n")))
}
